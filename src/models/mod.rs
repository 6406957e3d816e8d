pub mod market;
pub mod order;
pub mod position;

pub use market::{Market, MarketStatus};
pub use order::{
    BalanceResponse, CreateOrderRequest, CreateOrderResponse, DepositRequest, MintRequest,
};
pub use position::{Position, PositionView};
