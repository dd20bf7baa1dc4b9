use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scoring::Score;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub name: String,
    pub pts: u32,
    pub win: bool,
}

/// End of round summary, sent to everyone in the game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub game_name: String,
    pub results: Vec<PlayerResult>,
    pub winners: Vec<String>,
}

impl RoundReport {
    /// Winners are the players with a winning board, or failing that,
    /// whoever had the smallest penalty.
    pub fn new<'a, I>(game_name: String, scores: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Score)>,
    {
        let results: Vec<PlayerResult> = scores
            .into_iter()
            .map(|(name, score)| PlayerResult {
                name: name.to_string(),
                pts: score.pts,
                win: score.win,
            })
            .collect();

        let winners = if results.iter().any(|r| r.win) {
            results
                .iter()
                .filter(|r| r.win)
                .map(|r| r.name.clone())
                .collect()
        } else {
            let lowest = results.iter().map(|r| r.pts).min();
            results
                .iter()
                .filter(|r| Some(r.pts) == lowest)
                .map(|r| r.name.clone())
                .collect()
        };

        Self {
            game_name,
            results,
            winners,
        }
    }
}

impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Round of {} won by {}: {}",
            self.game_name,
            self.winners.join(", "),
            self.results
                .iter()
                .map(|r| format!("{} {}", r.name, r.pts))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TileSet;
    use crate::scoring::ScoreKind;

    fn verdict(pts: u32) -> Score {
        Score {
            win: pts == 0,
            pts,
            valid: TileSet::new(),
            invalid: TileSet::new(),
            unconnected: TileSet::new(),
            words: vec![],
            nonwords: vec![],
            msg: ScoreKind::Score,
        }
    }

    #[test]
    fn winning_board_takes_the_round() {
        let (a, b, c) = (verdict(4), verdict(0), verdict(2));
        let report = RoundReport::new("global".into(), [("ana", &a), ("bo", &b), ("cy", &c)]);
        assert_eq!(report.winners, vec!["bo"]);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.to_string(), "Round of global won by bo: ana 4, bo 0, cy 2");
    }

    #[test]
    fn smallest_penalty_breaks_a_winless_round() {
        let (a, b, c) = (verdict(3), verdict(5), verdict(3));
        let report = RoundReport::new("global".into(), [("ana", &a), ("bo", &b), ("cy", &c)]);
        assert_eq!(report.winners, vec!["ana", "cy"]);
    }

    #[test]
    fn report_on_the_wire() {
        let a = verdict(0);
        let report = RoundReport::new("global".into(), [("ana", &a)]);
        insta::assert_snapshot!(serde_json::to_string(&report).unwrap(), @r###"{"gameName":"global","results":[{"name":"ana","pts":0,"win":true}],"winners":["ana"]}"###);
    }
}
