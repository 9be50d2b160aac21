// Domain layer: core models and ports. Adapters and services depend on this, never the reverse.

pub mod model;
pub mod ports;
