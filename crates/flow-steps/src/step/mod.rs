pub mod dispatch;
pub mod input;
pub mod normalize;
pub mod options;

pub use dispatch::{Route, StepDispatcher};
pub use input::{GeneratePdfInput, RawBody, RawCollection, StepInput, UrlConfig};
pub use options::{NormalizedStep, RequestOptions};
