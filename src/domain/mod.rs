pub mod category;
pub mod climate;
pub mod forecast;
pub mod history;
pub mod run;
pub mod types;

pub use category::*;
pub use climate::*;
pub use forecast::*;
pub use history::*;
pub use run::*;
pub use types::*;
