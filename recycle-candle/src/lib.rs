pub mod losses;
pub mod networks;
pub mod optimizer;
pub mod replay;
pub mod tensors;
