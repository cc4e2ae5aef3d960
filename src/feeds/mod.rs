pub mod finnhub;
