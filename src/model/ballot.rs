use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An elected office on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Position unique ID.
    pub id: String,
    /// Display name, e.g. "President".
    pub name: String,
    /// Number of seats. Descriptive only: voters pick one candidate per position.
    #[serde(default = "one_seat")]
    pub seats: u32,
    /// Start of the voting window, if the backend reports one.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub voting_opens: Option<DateTime<Utc>>,
    /// End of the voting window, if the backend reports one.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub voting_closes: Option<DateTime<Utc>>,
}

fn one_seat() -> u32 {
    1
}

/// A window bound that does not parse is treated as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

/// RFC 3339, or a timestamp without an offset taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl Position {
    /// Whether the voting window contains `now`. Missing bounds are unbounded.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.voting_opens.map_or(true, |opens| opens <= now)
            && self.voting_closes.map_or(true, |closes| now < closes)
    }
}

/// The position a candidate is standing for, as embedded in the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Nomination review outcome.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    /// Degree programme of the candidate.
    #[serde(default)]
    pub program: String,
    /// Relative or absolute photo location; see [`crate::config::ClientConfig::file_url`].
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub status: CandidateStatus,
    pub position: PositionRef,
}

impl Candidate {
    pub fn position_id(&self) -> &str {
        &self.position.id
    }

    /// Up to two initials, used when there is no photo.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect()
    }
}

/// Everything a voter may vote on, as returned by `GET /vote/ballot`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub positions: Vec<Position>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub candidates: Vec<Candidate>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Ballot {
    pub fn position(&self, position_id: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == position_id)
    }

    /// Candidates standing for the given position, in ballot order.
    pub fn candidates_for<'a>(
        &'a self,
        position_id: &'a str,
    ) -> impl Iterator<Item = &'a Candidate> + 'a {
        self.candidates
            .iter()
            .filter(move |c| c.position_id() == position_id)
    }

    pub fn has_candidate(&self, position_id: &str, candidate_id: &str) -> bool {
        self.candidates_for(position_id).any(|c| c.id == candidate_id)
    }
}

#[cfg(any(test, feature = "sandbox"))]
mod examples {
    use super::*;

    impl Position {
        pub fn example(id: &str, name: &str) -> Self {
            Self {
                id: id.to_string(),
                name: name.to_string(),
                seats: 1,
                voting_opens: None,
                voting_closes: None,
            }
        }
    }

    impl Candidate {
        pub fn example(id: &str, name: &str, position: &Position) -> Self {
            Self {
                id: id.to_string(),
                name: name.to_string(),
                program: "BSc Computer Science".to_string(),
                photo_url: None,
                status: CandidateStatus::Approved,
                position: PositionRef {
                    id: position.id.clone(),
                    name: position.name.clone(),
                },
            }
        }
    }

    impl Ballot {
        /// Two positions with two approved candidates each.
        pub fn example() -> Self {
            let president = Position::example("pos-president", "President");
            let secretary = Position::example("pos-secretary", "General Secretary");
            Self {
                candidates: vec![
                    Candidate::example("cand-alice", "Alice Nakato", &president),
                    Candidate::example("cand-brian", "Brian Okello", &president),
                    Candidate::example("cand-carol", "Carol Auma", &secretary),
                    Candidate::example("cand-david", "David Mugisha", &secretary),
                ],
                positions: vec![president, secretary],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    #[test]
    fn deserialize_wire_format() {
        let ballot: Ballot = serde_json::from_value(json!({
            "positions": [{
                "id": "p1",
                "name": "President",
                "seats": 1,
                "votingOpens": "2026-03-01T08:00:00Z",
                "votingCloses": "2026-03-01T17:00:00Z",
            }],
            "candidates": [{
                "id": "c1",
                "name": "Alice Nakato",
                "program": "BBA",
                "photoUrl": "/uploads/alice.jpg",
                "status": "APPROVED",
                "position": { "id": "p1", "name": "President" },
            }],
        }))
        .unwrap();

        assert_eq!(ballot.positions.len(), 1);
        assert!(ballot.positions[0].voting_closes.is_some());
        assert_eq!(ballot.candidates[0].status, CandidateStatus::Approved);
        assert_eq!(
            ballot.candidates[0].photo_url.as_deref(),
            Some("/uploads/alice.jpg")
        );
        assert!(ballot.has_candidate("p1", "c1"));
        assert!(!ballot.has_candidate("p2", "c1"));
    }

    #[test]
    fn missing_or_null_lists_are_empty() {
        let ballot: Ballot = serde_json::from_value(json!({ "positions": null })).unwrap();
        assert_eq!(ballot, Ballot::default());

        let candidate: Candidate = serde_json::from_value(json!({
            "id": "c1",
            "name": "Alice",
            "status": "SOMETHING_NEW",
            "position": { "id": "p1" },
        }))
        .unwrap();
        assert_eq!(candidate.status, CandidateStatus::Unknown);
        assert_eq!(candidate.program, "");
    }

    #[test]
    fn loose_window_bounds() {
        let position: Position = serde_json::from_value(json!({
            "id": "p1",
            "name": "President",
            "votingOpens": "2026-03-01T08:00:00",
            "votingCloses": "next tuesday",
        }))
        .unwrap();
        assert_eq!(
            position.voting_opens,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(position.voting_closes, None);

        let position: Position = serde_json::from_value(json!({
            "id": "p1",
            "name": "President",
            "votingOpens": 1772352000,
            "votingCloses": null,
        }))
        .unwrap();
        assert_eq!(position.voting_opens, None);
        assert_eq!(position.voting_closes, None);
    }

    #[test]
    fn voting_window() {
        let now = Utc::now();
        let mut position = Position::example("p1", "President");
        assert!(position.is_open_at(now));

        position.voting_opens = Some(now - Duration::hours(1));
        position.voting_closes = Some(now + Duration::hours(1));
        assert!(position.is_open_at(now));

        position.voting_closes = Some(now);
        assert!(!position.is_open_at(now));

        position.voting_opens = Some(now + Duration::minutes(5));
        position.voting_closes = None;
        assert!(!position.is_open_at(now));
    }

    #[test]
    fn candidates_partitioned_by_position() {
        let ballot = Ballot::example();
        let names = ballot
            .candidates_for("pos-secretary")
            .map(|c| c.initials())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["CA", "DM"]);
        assert_eq!(ballot.candidates_for("nowhere").count(), 0);
    }
}
