// build.rs - Resolve the device tile geometry and set ESCALAR_DEVICE_* env vars
//
// The tile geometry (rows x columns of the analog crossbar) is fixed by the
// target hardware generation, not derived from data. Resolution order:
//
//   1. `device.yaml` next to Cargo.toml (checked into hardware bringup repos)
//   2. ESCALAR_DEVICE_ROWS / ESCALAR_DEVICE_COLS environment variables
//   3. Reference geometry 5 x 6
//
// The resolved values are emitted as `cargo:rustc-env` and consumed at
// compile time by `src/device.rs`.

use serde::Deserialize;
use std::path::Path;

/// Schema of the optional `device.yaml` geometry file.
#[derive(Deserialize)]
struct DeviceFile {
    rows: usize,
    cols: usize,
    #[serde(default)]
    #[allow(dead_code)]
    generation: Option<String>,
}

/// Reference geometry used when nothing else is configured.
const DEFAULT_ROWS: usize = 5;
const DEFAULT_COLS: usize = 6;

fn from_env(var: &str) -> Option<usize> {
    println!("cargo:rerun-if-env-changed={var}");
    match std::env::var(var) {
        Ok(s) => match s.parse::<usize>() {
            Ok(v) if v > 0 => Some(v),
            _ => {
                println!("cargo:warning={var}='{s}' is not a positive integer; ignoring");
                None
            }
        },
        Err(_) => None,
    }
}

fn main() {
    let device_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("device.yaml");
    println!("cargo:rerun-if-changed={}", device_path.display());

    let from_file = if device_path.exists() {
        match std::fs::read_to_string(&device_path) {
            Ok(yaml) => match serde_yaml::from_str::<DeviceFile>(&yaml) {
                Ok(f) if f.rows > 0 && f.cols > 0 => Some((f.rows, f.cols)),
                Ok(_) => {
                    println!("cargo:warning=device.yaml has zero dimensions; ignoring");
                    None
                }
                Err(e) => {
                    println!("cargo:warning=Failed to parse device.yaml: {e}; ignoring");
                    None
                }
            },
            Err(e) => {
                println!("cargo:warning=Failed to read device.yaml: {e}; ignoring");
                None
            }
        }
    } else {
        None
    };

    let env_rows = from_env("ESCALAR_DEVICE_ROWS");
    let env_cols = from_env("ESCALAR_DEVICE_COLS");

    let (rows, cols, source) = match (from_file, env_rows, env_cols) {
        (Some((r, c)), _, _) => (r, c, "device.yaml"),
        (None, Some(r), Some(c)) => (r, c, "environment"),
        (None, None, None) => (DEFAULT_ROWS, DEFAULT_COLS, "default"),
        _ => {
            println!(
                "cargo:warning=Only one of ESCALAR_DEVICE_ROWS/COLS set; \
                 using reference geometry {DEFAULT_ROWS}x{DEFAULT_COLS}"
            );
            (DEFAULT_ROWS, DEFAULT_COLS, "default")
        }
    };

    println!("cargo:rustc-env=ESCALAR_DEVICE_ROWS={rows}");
    println!("cargo:rustc-env=ESCALAR_DEVICE_COLS={cols}");
    println!("cargo:rustc-env=ESCALAR_DEVICE_SOURCE={source}");
}
