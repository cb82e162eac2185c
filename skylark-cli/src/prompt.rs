//! Interactive target selection

use skylark_attack::{SelectionView, SortKey};
use skylark_core::Network;
use std::io::{BufRead, Write};

/// What the operator chose at the prompt
#[derive(Debug)]
pub enum PromptAction {
    Selected(Network),
    Abort,
    Rescan,
}

fn render(view: &SelectionView) {
    println!();
    println!(
        "{:>3}  {:<24} {:<17} {:>3} {:>5}  {}",
        "#", "ESSID", "BSSID", "CH", "PWR", "ENC"
    );
    for (i, network) in view.iter().enumerate() {
        println!(
            "{:>3}  {:<24} {:<17} {:>3} {:>5}  {}",
            i + 1,
            network.display_essid(),
            network.bssid,
            network.channel,
            network.power,
            network.encryption
        );
    }
    println!();
    println!("number = attack, 0 = quit, r = rescan, s <power|channel|enc|essid> = sort, f <dBm> = min power, c <ch> = channel");
}

/// Blocking selection loop over a candidate list.
///
/// Filters narrow the view permanently; `r` throws it away and rescans.
pub fn select_target(mut view: SelectionView) -> PromptAction {
    let stdin = std::io::stdin();
    loop {
        if view.is_empty() {
            println!("no candidates left; r = rescan, 0 = quit");
        } else {
            render(&view);
        }
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            return PromptAction::Abort;
        }
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            None => continue,
            Some("0") | Some("q") => return PromptAction::Abort,
            Some("r") => return PromptAction::Rescan,
            Some("s") => match parts.next() {
                Some("power") => view.sort(SortKey::Power),
                Some("channel") => view.sort(SortKey::Channel),
                Some("enc") => view.sort(SortKey::Encryption),
                Some("essid") => view.sort(SortKey::Essid),
                _ => println!("sort keys: power, channel, enc, essid"),
            },
            Some("f") => match parts.next().and_then(|v| v.parse::<i32>().ok()) {
                Some(min) => view.retain_min_power(min),
                None => println!("usage: f <dBm>, e.g. f -70"),
            },
            Some("c") => match parts.next().and_then(|v| v.parse::<i32>().ok()) {
                Some(channel) => view.retain_channel(channel),
                None => println!("usage: c <channel>"),
            },
            Some(token) => match token.parse::<usize>() {
                Ok(k) => match view.select(k) {
                    Some(network) => return PromptAction::Selected(network.clone()),
                    None => println!("no candidate #{k}"),
                },
                Err(_) => println!("unrecognized input: {token}"),
            },
        }
    }
}
