mod app;
mod config;
mod input;
mod model;
mod queue;
mod registry;
mod render;
mod sim;
mod stage;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
