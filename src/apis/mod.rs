pub mod redfin;

pub use redfin::RedfinSearchClient;
