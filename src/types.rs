use serde::{Deserialize, Serialize};

use crate::error::GameError;

pub type RoundId = String;
/// Users are identified by the email the identity provider resolved.
pub type UserEmail = String;

/// The four competing tools players guess in round 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Dualite,
    Lovable,
    Bolt,
    V0,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Dualite, Tool::Lovable, Tool::Bolt, Tool::V0];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Dualite => "Dualite",
            Tool::Lovable => "Lovable",
            Tool::Bolt => "Bolt",
            Tool::V0 => "V0",
        }
    }
}

impl std::str::FromStr for Tool {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dualite" => Ok(Tool::Dualite),
            "Lovable" => Ok(Tool::Lovable),
            "Bolt" => Ok(Tool::Bolt),
            "V0" => Ok(Tool::V0),
            other => Err(GameError::InvalidInput(format!(
                "'{other}' is not a valid tool"
            ))),
        }
    }
}

/// The four fixed link slots shown in round 2. Each round binds every slot
/// to exactly one tool. Ordered so tallies iterate A..D deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkId {
    #[serde(rename = "LinkA")]
    A,
    #[serde(rename = "LinkB")]
    B,
    #[serde(rename = "LinkC")]
    C,
    #[serde(rename = "LinkD")]
    D,
}

impl LinkId {
    pub const ALL: [LinkId; 4] = [LinkId::A, LinkId::B, LinkId::C, LinkId::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkId::A => "LinkA",
            LinkId::B => "LinkB",
            LinkId::C => "LinkC",
            LinkId::D => "LinkD",
        }
    }
}

impl std::str::FromStr for LinkId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LinkA" => Ok(LinkId::A),
            "LinkB" => Ok(LinkId::B),
            "LinkC" => Ok(LinkId::C),
            "LinkD" => Ok(LinkId::D),
            other => Err(GameError::InvalidInput(format!(
                "'{other}' is not a valid link id"
            ))),
        }
    }
}

/// How a round awards points: the two-phase tool+link game, or the
/// single-phase variant where a flat bonus goes to winner-tool guessers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    #[default]
    TwoPhase,
    SinglePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Waiting,
    Round1,
    Round2,
    /// Single-phase rounds use one open state instead of round1/round2.
    Active,
    Ended,
}

impl std::str::FromStr for RoundStatus {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RoundStatus::Waiting),
            "round1" => Ok(RoundStatus::Round1),
            "round2" => Ok(RoundStatus::Round2),
            "active" => Ok(RoundStatus::Active),
            "ended" => Ok(RoundStatus::Ended),
            other => Err(GameError::InvalidInput(format!(
                "'{other}' is not a valid round status"
            ))),
        }
    }
}

/// One slot of a round's link↔tool bijection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkMapping {
    pub link_id: LinkId,
    pub tool: Tool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub title: String,
    pub scoring_mode: ScoringMode,
    /// Exactly four mappings, each link and each tool used once.
    pub link_mappings: Vec<LinkMapping>,
    pub status: RoundStatus,
    pub most_voted_link: Option<LinkId>,
    pub created_at: String,
    pub ended_at: Option<String>,
}

impl Round {
    /// Resolve the tool a link slot is bound to for this round.
    pub fn tool_for_link(&self, link: LinkId) -> Option<Tool> {
        self.link_mappings
            .iter()
            .find(|m| m.link_id == link)
            .map(|m| m.tool)
    }

    pub fn is_open_for_round_one(&self) -> bool {
        matches!(
            (self.scoring_mode, self.status),
            (ScoringMode::TwoPhase, RoundStatus::Round1)
                | (ScoringMode::SinglePhase, RoundStatus::Active)
        )
    }

    pub fn is_open_for_round_two(&self) -> bool {
        matches!(
            (self.scoring_mode, self.status),
            (ScoringMode::TwoPhase, RoundStatus::Round2)
                | (ScoringMode::SinglePhase, RoundStatus::Active)
        )
    }
}

/// Which sub-bonuses a finalized guess earned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub tool_match: bool,
    pub most_voted_bonus: bool,
    pub tool_match_points: u32,
    pub most_voted_points: u32,
}

impl PointsBreakdown {
    pub const ZERO: PointsBreakdown = PointsBreakdown {
        tool_match: false,
        most_voted_bonus: false,
        tool_match_points: 0,
        most_voted_points: 0,
    };

    pub fn total(&self) -> u32 {
        self.tool_match_points + self.most_voted_points
    }
}

/// One user's participation record for one round. Unique per (user, round);
/// each choice field is write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guess {
    pub user_email: UserEmail,
    pub round_id: RoundId,
    pub round1_choice: Option<Tool>,
    pub round1_completed_at: Option<String>,
    pub round2_choice: Option<LinkId>,
    pub round2_completed_at: Option<String>,
    pub points_earned: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<PointsBreakdown>,
    pub created_at: String,
}

impl Guess {
    pub fn is_complete(&self) -> bool {
        self.round1_choice.is_some() && self.round2_choice.is_some()
    }
}

/// A user's link preference, kept separate from the guess so the tally stays
/// computable if the scoring model changes. Upsertable, last write wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub user_email: UserEmail,
    pub round_id: RoundId,
    pub link_choice: LinkId,
    pub created_at: String,
}

/// Running point total for a user across all rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPoints {
    pub email: UserEmail,
    pub points: u32,
}
