// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod bindings;
pub mod filter;
pub mod fragment;
pub mod ids;
pub mod model;
pub mod refresh;
pub mod request;
pub mod state;

pub use bindings::*;
pub use filter::*;
pub use fragment::*;
pub use ids::*;
pub use model::*;
pub use refresh::*;
pub use request::*;
pub use state::*;
