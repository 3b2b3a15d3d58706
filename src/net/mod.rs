pub mod dispatch;
pub mod game;
pub mod packet;
