//! One matrix-vector pass through the driver, end to end.
//!
//! Builds a 3x4 matrix of 3.0 and a length-4 vector of 2.0, quantizes both
//! to 8-bit tiles, runs the MVM on the mock accelerator, and stores the
//! dequantized result (each element: 4 * 3.0 * 2.0 = 24.0).
//!
//! Run: cargo run --example mvm_roundtrip

use escalar::trace::TraceConfig;
use escalar::{AnalogMatrix, AnalogVector, MockAccelerator, MvmDriver, TileId};

fn main() -> escalar::Result<()> {
    let mut driver = MvmDriver::with_trace(MockAccelerator::new(1), 1, TraceConfig::enabled());
    let tile = TileId::new(0);

    let mut mat: AnalogMatrix<'_, f32, i8> = AnalogMatrix::from_vec(3, 4, vec![3.0; 12])?;
    let mut vin: AnalogVector<'_, f32, i8> = AnalogVector::from_vec(vec![2.0; 4])?;
    let mut vout: AnalogVector<'_, f32, i32> = AnalogVector::zeros(3)?;

    driver.set_matrix(&mut mat, tile)?;
    driver.load_vector(&mut vin, tile)?;
    driver.compute(tile)?;
    driver.store_vector(&mut vout, tile)?;

    println!("matrix scale:  {:.6}", mat.effective_scale());
    println!("vector scale:  {:.6}", vin.effective_scale());
    println!(
        "output scale:  {:.6}",
        driver.context().output_scale(tile)?
    );
    println!("result:        {:?}", vout.host());

    if let Ok(json) = driver.trace().to_json() {
        println!("instruction trace:\n{json}");
    }
    Ok(())
}
