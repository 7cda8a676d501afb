mod ledger;
mod repository;
mod schema;
mod tally;

pub use repository::Repository;
