//! Note book: one note per (author role, appointment).

use crate::types::{AppointmentId, Note, NoteKey, ParticipantId, Role};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Filter for note queries. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub author_id: Option<ParticipantId>,
    pub author_role: Option<Role>,
    pub appointment_id: Option<AppointmentId>,
    pub subject: Option<String>,
    pub counterpart_name: Option<String>,
}

impl NoteFilter {
    pub fn by_author(author_id: impl Into<String>, role: Role) -> Self {
        Self {
            author_id: Some(ParticipantId::new(author_id)),
            author_role: Some(role),
            ..Default::default()
        }
    }

    pub fn for_appointment(appointment_id: AppointmentId) -> Self {
        Self {
            appointment_id: Some(appointment_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, note: &Note) -> bool {
        if let Some(ref author_id) = self.author_id {
            if &note.author_id != author_id {
                return false;
            }
        }
        if let Some(role) = self.author_role {
            if note.key.author_role != role {
                return false;
            }
        }
        if let Some(id) = self.appointment_id {
            if note.key.appointment_id != id {
                return false;
            }
        }
        if let Some(ref subject) = self.subject {
            if &note.subject != subject {
                return false;
            }
        }
        if let Some(ref counterpart) = self.counterpart_name {
            if &note.counterpart_name != counterpart {
                return false;
            }
        }
        true
    }
}

/// Notes keyed by `NoteKey`, cross-indexed by (subject, counterpart name).
#[derive(Debug, Default)]
pub struct NoteBook {
    notes: BTreeMap<NoteKey, Note>,
    by_topic: HashMap<(String, String), BTreeSet<NoteKey>>,
}

impl NoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the note at `note.key`. Returns the previous version.
    pub fn upsert(&mut self, note: Note) -> Option<Note> {
        let key = note.key;
        let topic = (note.subject.clone(), note.counterpart_name.clone());
        let previous = self.notes.insert(key, note);

        // Names are denormalized at write time, so a note can move topics.
        if let Some(ref old) = previous {
            let old_topic = (old.subject.clone(), old.counterpart_name.clone());
            if old_topic != topic {
                if let Some(keys) = self.by_topic.get_mut(&old_topic) {
                    keys.remove(&key);
                    if keys.is_empty() {
                        self.by_topic.remove(&old_topic);
                    }
                }
            }
        }
        self.by_topic.entry(topic).or_default().insert(key);
        previous
    }

    pub fn get(&self, key: &NoteKey) -> Option<&Note> {
        self.notes.get(key)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn query(&self, filter: &NoteFilter) -> Vec<Note> {
        self.notes
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect()
    }

    /// Every note about `subject` with `counterpart_name`, oldest update first.
    pub fn history(&self, subject: &str, counterpart_name: &str) -> Vec<Note> {
        let topic = (subject.to_string(), counterpart_name.to_string());
        let mut found: Vec<Note> = self
            .by_topic
            .get(&topic)
            .into_iter()
            .flatten()
            .filter_map(|key| self.notes.get(key))
            .cloned()
            .collect();
        found.sort_by_key(|n| (n.updated_at, n.key));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn note(role: Role, appointment: u64, text: &str, at: i64) -> Note {
        Note {
            key: NoteKey {
                author_role: role,
                appointment_id: AppointmentId(appointment),
            },
            author_id: ParticipantId::new("s1"),
            subject: "Algebra".into(),
            counterpart_name: "Ms. Rao".into(),
            text: text.into(),
            updated_at: Timestamp(at),
        }
    }

    #[test]
    fn test_upsert_keeps_one_note_per_key() {
        let mut book = NoteBook::new();
        assert!(book.upsert(note(Role::Student, 1, "first", 1)).is_none());
        let previous = book.upsert(note(Role::Student, 1, "second", 2)).unwrap();

        assert_eq!(previous.text, "first");
        assert_eq!(book.len(), 1);
        assert_eq!(book.history("Algebra", "Ms. Rao").len(), 1);
        assert_eq!(book.history("Algebra", "Ms. Rao")[0].text, "second");
    }

    #[test]
    fn test_roles_do_not_share_a_key() {
        let mut book = NoteBook::new();
        book.upsert(note(Role::Student, 1, "mine", 1));
        book.upsert(note(Role::Teacher, 1, "theirs", 2));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_history_spans_appointments() {
        let mut book = NoteBook::new();
        book.upsert(note(Role::Student, 2, "later", 20));
        book.upsert(note(Role::Student, 1, "earlier", 10));

        let texts: Vec<String> = book
            .history("Algebra", "Ms. Rao")
            .into_iter()
            .map(|n| n.text)
            .collect();
        assert_eq!(texts, vec!["earlier", "later"]);
        assert!(book.history("Algebra", "Mr. Lee").is_empty());
    }

    #[test]
    fn test_topic_move_updates_index() {
        let mut book = NoteBook::new();
        book.upsert(note(Role::Student, 1, "a", 1));
        let mut moved = note(Role::Student, 1, "b", 2);
        moved.counterpart_name = "Mr. Lee".into();
        book.upsert(moved);

        assert!(book.history("Algebra", "Ms. Rao").is_empty());
        assert_eq!(book.history("Algebra", "Mr. Lee").len(), 1);
        assert_eq!(book.by_topic.len(), 1);
        assert!(!book
            .by_topic
            .contains_key(&("Algebra".to_string(), "Ms. Rao".to_string())));
    }
}
