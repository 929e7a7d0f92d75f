// In-process stand-ins for the vehicle SDK and the speech stack.
pub mod library;
pub mod sim;
pub mod speech;
