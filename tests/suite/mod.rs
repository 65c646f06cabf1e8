mod classifier;
mod dispatch;
mod render;
mod session;
