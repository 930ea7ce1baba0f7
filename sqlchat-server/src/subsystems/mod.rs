pub mod chain;
pub mod connect;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;
