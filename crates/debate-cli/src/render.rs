//! Plain console output for rounds and final statistics.

use discussion::{DiscussionSummary, Turn};

const RULE: &str = "==================================================";

/// Print one recorded turn with a banner.
pub fn print_turn(turn: &Turn) {
    println!();
    println!("{RULE}");
    println!("{} - round {}", turn.speaker, turn.round);
    println!("{RULE}");
    println!("{}", turn.text);
}

/// Print the end-of-discussion statistics block.
pub fn print_summary(summary: &DiscussionSummary) {
    println!();
    println!("{RULE}");
    println!("Discussion ended");
    println!("{RULE}");
    println!("Total rounds: {}", summary.total_rounds);
    println!("End reason: {}", summary.end_reason);
    match summary.winner {
        Some(winner) => println!("Winner: {winner}"),
        None => println!("Winner: none"),
    }
    println!("Duration: {:.1}s", summary.duration.as_secs_f64());
    println!("Responder calls: {}", summary.responder_calls);
}
