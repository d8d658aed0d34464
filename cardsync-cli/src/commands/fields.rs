//! Fields command - show the project's field schema

use anyhow::Context;
use cardsync_core::{Board, BoardGateway, Config};

/// Execute the fields command
pub async fn execute(gateway: &dyn BoardGateway, config: &Config) -> anyhow::Result<()> {
    let board = gateway
        .fetch_board(&config.project)
        .await
        .context("failed to load github project")?;

    print!("{}", render(&board));
    Ok(())
}

fn render(board: &Board) -> String {
    let mut out = format!("{} ({})\n", board.title, board.id);

    for field in &board.fields {
        out.push_str(&format!("  {} [{}]\n", field.name, field.kind.label()));
        for option in field.options() {
            out.push_str(&format!("    - {}\n", option.name));
        }
    }

    out
}
