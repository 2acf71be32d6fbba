pub mod admin;
pub mod enums;
pub mod medication;
pub mod review;
pub mod side_effect;
pub mod weekly;

pub use admin::*;
pub use enums::*;
pub use medication::*;
pub use review::*;
pub use side_effect::*;
pub use weekly::*;
