//! Domain models shared between server and clients

pub mod menu;
pub mod order;
pub mod table;

pub use menu::{MenuCategory, MenuProduct};
pub use order::{
    BillCreate, DraftItem, Order, OrderCreate, OrderDetail, OrderDetailCreate, OrderDetailRemove,
    OrderDetailUpdate, OrderDraft, OrderStatus, OrderUpdate,
};
pub use table::DiningTable;
