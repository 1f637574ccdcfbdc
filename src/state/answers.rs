use indexmap::IndexMap;

use crate::state::{
    dispatcher::ConnectionId,
    game::{AnswerRecord, OPTION_COUNT},
};

/// Per-option counts for the answers of one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerTally {
    pub question_index: usize,
    /// Number of submissions per option index.
    pub counts: [u32; OPTION_COUNT],
    pub total_answered: u32,
}

/// Answer records of a session, one bucket per question.
///
/// A bucket holds at most one record per connection.
#[derive(Debug)]
pub struct AnswerAggregator {
    buckets: Vec<IndexMap<ConnectionId, AnswerRecord>>,
}

impl AnswerAggregator {
    pub fn new(question_count: usize) -> Self {
        Self {
            buckets: (0..question_count).map(|_| IndexMap::new()).collect(),
        }
    }

    /// Empty the bucket of `question_index` before the question opens.
    pub fn reset(&mut self, question_index: usize) {
        if let Some(bucket) = self.buckets.get_mut(question_index) {
            bucket.clear();
        }
    }

    pub fn has_answered(&self, question_index: usize, connection: &ConnectionId) -> bool {
        self.buckets
            .get(question_index)
            .is_some_and(|bucket| bucket.contains_key(connection))
    }

    /// Store `record` unless the connection already answered; returns whether it was stored.
    pub fn record(&mut self, question_index: usize, record: AnswerRecord) -> bool {
        let Some(bucket) = self.buckets.get_mut(question_index) else {
            return false;
        };
        if bucket.contains_key(&record.connection) {
            return false;
        }
        bucket.insert(record.connection, record);
        true
    }

    /// Drop every record of a connection that left the session.
    pub fn forget(&mut self, connection: &ConnectionId) {
        for bucket in &mut self.buckets {
            bucket.shift_remove(connection);
        }
    }

    pub fn answers(&self, question_index: usize) -> impl Iterator<Item = &AnswerRecord> {
        self.buckets
            .get(question_index)
            .into_iter()
            .flat_map(|bucket| bucket.values())
    }

    pub fn tally(&self, question_index: usize) -> AnswerTally {
        let mut counts = [0u32; OPTION_COUNT];
        let mut total_answered = 0;
        for record in self.answers(question_index) {
            if let Some(count) = counts.get_mut(record.option_index) {
                *count += 1;
            }
            total_answered += 1;
        }
        AnswerTally {
            question_index,
            counts,
            total_answered,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn record(connection: ConnectionId, option_index: usize) -> AnswerRecord {
        AnswerRecord {
            connection,
            option_index,
            time_remaining: 10.0,
            correct: option_index == 1,
            points: if option_index == 1 { 1100 } else { 0 },
        }
    }

    #[test]
    fn second_record_for_same_question_is_refused() {
        let mut answers = AnswerAggregator::new(2);
        let player = Uuid::new_v4();

        assert!(answers.record(0, record(player, 1)));
        assert!(!answers.record(0, record(player, 2)));
        assert!(answers.record(1, record(player, 2)));

        let tally = answers.tally(0);
        assert_eq!(tally.counts, [0, 1, 0, 0]);
        assert_eq!(tally.total_answered, 1);
    }

    #[test]
    fn tally_sums_to_the_number_of_records() {
        let mut answers = AnswerAggregator::new(1);
        for option in [0, 1, 1, 3, 1] {
            answers.record(0, record(Uuid::new_v4(), option));
        }

        let tally = answers.tally(0);
        assert_eq!(tally.counts, [1, 3, 0, 1]);
        assert_eq!(tally.counts.iter().sum::<u32>(), tally.total_answered);
        assert_eq!(tally.total_answered as usize, answers.answers(0).count());
    }

    #[test]
    fn out_of_range_question_is_ignored() {
        let mut answers = AnswerAggregator::new(1);
        assert!(!answers.record(5, record(Uuid::new_v4(), 0)));
        assert_eq!(answers.tally(5).total_answered, 0);
    }

    #[test]
    fn forget_and_reset_clear_records() {
        let mut answers = AnswerAggregator::new(1);
        let leaving = Uuid::new_v4();
        answers.record(0, record(leaving, 0));
        answers.record(0, record(Uuid::new_v4(), 1));

        answers.forget(&leaving);
        assert!(!answers.has_answered(0, &leaving));
        assert_eq!(answers.tally(0).total_answered, 1);

        answers.reset(0);
        assert_eq!(answers.tally(0).total_answered, 0);
    }
}
