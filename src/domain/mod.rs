// Domain layer: statement/report models and the ports the runner depends on.

pub mod model;
pub mod ports;
