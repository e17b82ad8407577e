//! Birthdays, anniversaries and lodge events, projected onto their next
//! occurrence and merged for the commemorative-dates report.

use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;

use crate::error::Result;
use crate::models::{CustomEvent, FamilyMember, Member, MemberStatus, Relationship};
use crate::occurrence::{next_occurrence, LeapDayPolicy, MonthDay, Window};
use crate::registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occasion {
    Birthday,
    Initiation,
    Elevation,
    Exaltation,
    Wedding,
    FamilyBirthday,
    Event(String),
}

impl fmt::Display for Occasion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occasion::Birthday => f.write_str("birthday"),
            Occasion::Initiation => f.write_str("initiation"),
            Occasion::Elevation => f.write_str("elevation"),
            Occasion::Exaltation => f.write_str("exaltation"),
            Occasion::Wedding => f.write_str("wedding"),
            Occasion::FamilyBirthday => f.write_str("family birthday"),
            Occasion::Event(kind) => f.write_str(kind),
        }
    }
}

/// Link between a family member and the brother they are registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub relationship: Relationship,
    pub owner: String,
}

#[derive(Debug, Clone)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub name: String,
    pub occasion: Occasion,
    /// Stored date the occurrence recurs from; events carry none.
    pub origin: Option<NaiveDate>,
    /// Family links, in the order they were first seen.
    pub relations: Vec<Relation>,
    pub note: Option<String>,
}

impl Occurrence {
    fn new(date: NaiveDate, name: &str, occasion: Occasion, origin: Option<NaiveDate>) -> Self {
        Self {
            date,
            name: name.to_string(),
            occasion,
            origin,
            relations: Vec::new(),
            note: None,
        }
    }

    /// Age turned or years completed on this occurrence.
    pub fn years(&self) -> Option<i32> {
        self.origin
            .map(|o| self.date.year() - o.year())
            .filter(|y| *y >= 0)
    }

    /// Display type. For family entries this is the union of relationship
    /// labels, e.g. `wife / daughter`.
    pub fn type_label(&self) -> String {
        if self.relations.is_empty() {
            return self.occasion.to_string();
        }
        let mut labels: Vec<&str> = Vec::new();
        for r in &self.relations {
            let label = r.relationship.as_str();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels.join(" / ")
    }

    /// `Daughter of Brother Pedro; Wife of Brother João`
    pub fn statement(&self) -> String {
        self.relations
            .iter()
            .map(|r| format!("{} of Brother {}", r.relationship.title(), r.owner))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Lowercased, trimmed, accent-free name with single spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.to_lowercase().chars().map(fold_accent).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Merge family occurrences that name the same person.
///
/// Two records are the same person when their normalized names and birth
/// dates match. The first record seen stays as the base entry and later
/// matches only contribute their relations.
pub fn consolidate_family(records: Vec<Occurrence>) -> Vec<Occurrence> {
    let mut merged: Vec<Occurrence> = Vec::with_capacity(records.len());
    let mut seen: HashMap<(String, Option<NaiveDate>), usize> = HashMap::new();

    for record in records {
        let key = (normalize_name(&record.name), record.origin);
        match seen.get(&key) {
            Some(&idx) => merged[idx].relations.extend(record.relations),
            None => {
                seen.insert(key, merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

fn member_occurrences(member: &Member, today: NaiveDate, policy: LeapDayPolicy) -> Vec<Occurrence> {
    let dated = [
        (member.birth_date, Occasion::Birthday),
        (member.initiated_on, Occasion::Initiation),
        (member.elevated_on, Occasion::Elevation),
        (member.exalted_on, Occasion::Exaltation),
        (member.married_on, Occasion::Wedding),
    ];
    dated
        .into_iter()
        .filter_map(|(date, occasion)| {
            let origin = date?;
            let next = next_occurrence(MonthDay::from(origin), today, policy);
            let mut occ = Occurrence::new(next, &member.name, occasion, Some(origin));
            occ.note = member.role.clone();
            Some(occ)
        })
        .collect()
}

fn event_occurrence(event: &CustomEvent, today: NaiveDate, policy: LeapDayPolicy) -> Occurrence {
    let next = next_occurrence(event.day, today, policy);
    let mut occ = Occurrence::new(next, &event.name, Occasion::Event(event.event_type.clone()), None);
    occ.note = event.description.clone();
    occ
}

/// Every occurrence, consolidated and sorted by date, then name.
///
/// Deceased members contribute nothing, and neither do their relatives.
/// Relatives without a birth date or marked deceased are skipped.
pub fn collect(
    members: &[Member],
    family: &[FamilyMember],
    events: &[CustomEvent],
    today: NaiveDate,
    policy: LeapDayPolicy,
) -> Vec<Occurrence> {
    let owners: HashMap<i64, &Member> = members.iter().map(|m| (m.id, m)).collect();
    let mut out: Vec<Occurrence> = members
        .iter()
        .filter(|m| m.status == MemberStatus::Active)
        .flat_map(|m| member_occurrences(m, today, policy))
        .collect();

    let relatives: Vec<Occurrence> = family
        .iter()
        .filter(|f| !f.deceased)
        .filter_map(|f| {
            let owner = owners.get(&f.member_id).filter(|m| m.status == MemberStatus::Active)?;
            let birth = f.birth_date?;
            let next = next_occurrence(MonthDay::from(birth), today, policy);
            let mut occ = Occurrence::new(next, &f.name, Occasion::FamilyBirthday, Some(birth));
            occ.relations.push(Relation {
                relationship: f.relationship,
                owner: owner.name.clone(),
            });
            Some(occ)
        })
        .collect();
    out.extend(consolidate_family(relatives));

    out.extend(events.iter().map(|e| event_occurrence(e, today, policy)));

    out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
    out
}

pub fn upcoming(
    conn: &Connection,
    today: NaiveDate,
    window: Window,
    policy: LeapDayPolicy,
) -> Result<Vec<Occurrence>> {
    let members = registry::list_members(conn, true)?;
    let family = registry::list_family(conn, None)?;
    let events = registry::list_events(conn)?;

    let all = collect(&members, &family, &events, today, policy);
    let total = all.len();
    let selected: Vec<Occurrence> = all
        .into_iter()
        .filter(|o| window.contains(o.date, today))
        .collect();
    tracing::debug!(%today, %window, total, selected = selected.len(), "commemorative dates computed");
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::NewMember;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn member(id: i64, name: &str, birth: Option<NaiveDate>) -> Member {
        Member {
            id,
            name: name.to_string(),
            cim: None,
            birth_date: birth,
            status: MemberStatus::Active,
            role: None,
            initiated_on: None,
            elevated_on: None,
            exalted_on: None,
            married_on: None,
        }
    }

    fn relative(id: i64, owner: i64, name: &str, rel: Relationship, birth: Option<NaiveDate>) -> FamilyMember {
        FamilyMember {
            id,
            member_id: owner,
            name: name.to_string(),
            relationship: rel,
            birth_date: birth,
            deceased: false,
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Maria   Silva "), "maria silva");
        assert_eq!(normalize_name("JOSÉ da Conceição"), "jose da conceicao");
        assert_eq!(normalize_name("Açaí Ñandú"), "acai nandu");
    }

    #[test]
    fn test_same_person_under_two_members_is_merged() {
        let members = vec![member(1, "João", None), member(2, "Pedro", None)];
        let family = vec![
            relative(10, 1, "Maria Silva", Relationship::Wife, Some(d(1980, 5, 1))),
            relative(11, 2, "maria  silva", Relationship::Daughter, Some(d(1980, 5, 1))),
        ];
        let out = collect(&members, &family, &[], d(2024, 3, 15), LeapDayPolicy::Feb28);
        assert_eq!(out.len(), 1);
        let maria = &out[0];
        assert_eq!(maria.name, "Maria Silva");
        assert_eq!(maria.type_label(), "wife / daughter");
        assert_eq!(maria.statement(), "Wife of Brother João; Daughter of Brother Pedro");
        assert_eq!(maria.date, d(2024, 5, 1));
        assert_eq!(maria.years(), Some(44));
    }

    #[test]
    fn test_different_birth_dates_are_not_merged() {
        let members = vec![member(1, "João", None)];
        let family = vec![
            relative(10, 1, "Ana", Relationship::Daughter, Some(d(2001, 1, 2))),
            relative(11, 1, "Ana", Relationship::Daughter, Some(d(2003, 1, 2))),
        ];
        let out = collect(&members, &family, &[], d(2024, 1, 1), LeapDayPolicy::Feb28);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_repeated_relationship_label_listed_once() {
        let records = vec![
            {
                let mut o = Occurrence::new(d(2024, 6, 1), "Clara", Occasion::FamilyBirthday, Some(d(1990, 6, 1)));
                o.relations.push(Relation { relationship: Relationship::Daughter, owner: "A".into() });
                o
            },
            {
                let mut o = Occurrence::new(d(2024, 6, 1), "Clara", Occasion::FamilyBirthday, Some(d(1990, 6, 1)));
                o.relations.push(Relation { relationship: Relationship::Daughter, owner: "B".into() });
                o
            },
        ];
        let merged = consolidate_family(records);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].type_label(), "daughter");
        assert_eq!(merged[0].relations.len(), 2);
    }

    #[test]
    fn test_deceased_are_skipped() {
        let mut gone = member(1, "Antônio", Some(d(1950, 4, 1)));
        gone.status = MemberStatus::Deceased;
        let members = vec![gone, member(2, "Bento", Some(d(1960, 4, 2)))];
        let widow = relative(10, 1, "Helena", Relationship::Wife, Some(d(1955, 4, 3)));
        let mut late_father = relative(11, 2, "Otávio", Relationship::Father, Some(d(1930, 4, 4)));
        late_father.deceased = true;
        let undated = relative(12, 2, "Rosa", Relationship::Mother, None);
        let family = vec![widow, late_father, undated];

        let out = collect(&members, &family, &[], d(2024, 1, 1), LeapDayPolicy::Feb28);
        let names: Vec<&str> = out.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Bento"]);
    }

    #[test]
    fn test_member_anniversaries_and_events_sorted() {
        let mut m = member(1, "Carlos", Some(d(1970, 12, 5)));
        m.initiated_on = Some(d(2000, 3, 20));
        m.married_on = Some(d(1995, 3, 16));
        let events = vec![CustomEvent {
            id: 1,
            name: "Fundação da Loja".to_string(),
            event_type: "fundação".to_string(),
            day: MonthDay::new(3, 18).unwrap(),
            description: None,
        }];
        let out = collect(&[m], &[], &events, d(2024, 3, 15), LeapDayPolicy::Feb28);
        let summary: Vec<(NaiveDate, String)> = out.iter().map(|o| (o.date, o.occasion.to_string())).collect();
        assert_eq!(
            summary,
            vec![
                (d(2024, 3, 16), "wedding".to_string()),
                (d(2024, 3, 18), "fundação".to_string()),
                (d(2024, 3, 20), "initiation".to_string()),
                (d(2024, 12, 5), "birthday".to_string()),
            ]
        );
        assert_eq!(out[0].years(), Some(29));
        assert_eq!(out[1].years(), None);
    }

    #[test]
    fn test_upcoming_filters_by_window() {
        let (_dir, conn) = test_db();
        registry::add_member(
            &conn,
            &NewMember {
                name: "Davi".to_string(),
                birth_date: Some(d(1980, 3, 20)),
                ..Default::default()
            },
        )
        .unwrap();
        registry::add_member(
            &conn,
            &NewMember {
                name: "Elias".to_string(),
                birth_date: Some(d(1980, 1, 10)),
                ..Default::default()
            },
        )
        .unwrap();
        let today = d(2024, 3, 15);
        let week = upcoming(&conn, today, Window::Week, LeapDayPolicy::Feb28).unwrap();
        assert_eq!(week.len(), 1);
        assert_eq!(week[0].name, "Davi");
        assert!(upcoming(&conn, today, Window::Today, LeapDayPolicy::Feb28).unwrap().is_empty());
        let all = upcoming(&conn, today, Window::All, LeapDayPolicy::Feb28).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].date, d(2025, 1, 10));
    }
}
