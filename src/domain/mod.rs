// Domain layer: remote object snapshots and the ports to the management plane and terminal.

pub mod model;
pub mod ports;
