pub mod category;
pub mod delivery_point;
pub mod manufacturer;
pub mod order;
pub mod order_item;
pub mod product; // catalog entry, owns references to the three name-keyed entities
pub mod supplier;

pub use order::OrderStatus;
