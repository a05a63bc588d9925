pub mod climate;
pub mod scenario;
pub mod series;
pub mod time;

pub use climate::*;
pub use scenario::*;
pub use series::*;
pub use time::*;
