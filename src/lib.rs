pub mod amap;
pub mod cache;
pub mod lock;
pub mod monitor;
pub mod stack;
