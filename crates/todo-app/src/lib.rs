// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod dates;
pub mod error;
pub mod ids;
pub mod model;
pub mod reconcile;
pub mod store;

pub use dates::*;
pub use error::*;
pub use ids::*;
pub use model::*;
pub use reconcile::*;
pub use store::*;
