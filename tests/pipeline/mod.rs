mod cancellation;
mod simulated;
