pub mod attempt;
pub mod cart;
pub mod checkout;
pub mod intake;
pub mod verify;
