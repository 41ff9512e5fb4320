//! Register-level drivers for the unit's bus chips.

pub mod bmp180;
pub mod mpu6050;
pub mod ms4525do;
pub mod qmc5883l;
pub mod tca9548a;

#[cfg(test)]
pub(crate) mod mock;
