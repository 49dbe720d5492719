// src/engine/generator.rs

use rand::{Rng, seq::SliceRandom};

use super::trial::{Expected, Symbol, Trial};
use crate::activities::{Activity, Level, Task};

/// Builds the stimulus set of one level.
pub fn generate_round<R: Rng + ?Sized>(
    activity: &Activity,
    level: &Level,
    rng: &mut R,
) -> Vec<Trial> {
    let count = level.trials as usize;
    match activity.task {
        Task::GoNoGo { go, no_go } => go_no_go(go, no_go, count, level.load, rng),
        Task::Recall { alphabet } => (0..count)
            .map(|i| {
                let sequence: Vec<Symbol> = (0..level.load)
                    .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                    .collect();
                Trial::new(i, sequence.clone(), Expected::Recall(sequence))
            })
            .collect(),
        Task::Choice { pool } => (0..count)
            .map(|i| {
                let answer = pool[rng.gen_range(0..pool.len())];
                let mut choices: Vec<Symbol> = pool
                    .iter()
                    .copied()
                    .filter(|s| *s != answer)
                    .collect();
                choices.shuffle(rng);
                choices.truncate((level.load as usize).saturating_sub(1));
                choices.push(answer);
                choices.shuffle(rng);
                Trial::new(i, vec![answer], Expected::Choose(answer)).with_choices(choices)
            })
            .collect(),
        Task::Paced => (0..count)
            .map(|i| Trial::new(i, vec![Symbol::Inhale], Expected::Press))
            .collect(),
    }
}

fn go_no_go<R: Rng + ?Sized>(
    go: Symbol,
    no_go: &[Symbol],
    count: usize,
    no_go_percent: u8,
    rng: &mut R,
) -> Vec<Trial> {
    let no_go_count = ((count * no_go_percent as usize) as f64 / 100.0).round() as usize;
    let mut stimuli: Vec<(Symbol, Expected)> = Vec::with_capacity(count);
    for i in 0..count {
        if i < no_go_count && !no_go.is_empty() {
            let symbol = no_go[rng.gen_range(0..no_go.len())];
            stimuli.push((symbol, Expected::Withhold));
        } else {
            stimuli.push((go, Expected::Press));
        }
    }
    stimuli.shuffle(rng);
    stimuli
        .into_iter()
        .enumerate()
        .map(|(i, (symbol, expected))| Trial::new(i, vec![symbol], expected))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::find;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn go_no_go_mix_follows_level_load() {
        let activity = find("traffic_light").unwrap();
        let level = activity.level(1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let round = generate_round(activity, level, &mut rng);

        assert_eq!(round.len(), 20);
        let withhold = round
            .iter()
            .filter(|t| t.expected == Expected::Withhold)
            .count();
        assert_eq!(withhold, 5);
        assert!(round.iter().enumerate().all(|(i, t)| t.index == i));
    }

    #[test]
    fn recall_sequences_have_level_length() {
        let activity = find("number_echo").unwrap();
        let level = activity.level(4).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for trial in generate_round(activity, level, &mut rng) {
            assert_eq!(trial.stimulus.len(), 6);
            assert_eq!(trial.expected, Expected::Recall(trial.stimulus.clone()));
        }
    }

    #[test]
    fn choices_contain_the_answer_once() {
        let activity = find("feeling_faces").unwrap();
        let level = activity.level(1).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for trial in generate_round(activity, level, &mut rng) {
            assert_eq!(trial.choices.len(), 3);
            let answer = trial.stimulus[0];
            assert_eq!(trial.choices.iter().filter(|c| **c == answer).count(), 1);
        }
    }

    #[test]
    fn same_seed_same_round() {
        let activity = find("star_watch").unwrap();
        let level = activity.level(2).unwrap();
        let a = generate_round(activity, level, &mut StdRng::seed_from_u64(42));
        let b = generate_round(activity, level, &mut StdRng::seed_from_u64(42));
        let symbols = |r: &[Trial]| r.iter().map(|t| t.stimulus.clone()).collect::<Vec<_>>();
        assert_eq!(symbols(&a), symbols(&b));
    }
}
