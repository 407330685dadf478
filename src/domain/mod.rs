// Domain layer: collection records, report types and ports. No I/O here.

pub mod model;
pub mod ports;
pub mod report;
