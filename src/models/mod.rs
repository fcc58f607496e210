pub mod order;
pub mod packet;
pub mod rate;

pub use order::{OrderRow, OrderStatus};
pub use packet::{OrderPacket, PacketPatient, PacketPhysician};
pub use rate::{RateTable, SchemaFeatures};
