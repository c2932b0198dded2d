pub mod export;
pub mod infer;
pub mod inspect;
pub mod serve;
