use super::syllable::Syllable;

/// Syllable count per pada.
///
/// Dandas split the verse when present. Otherwise the words are grouped
/// into roughly four equal runs; fewer than four words count as one pada.
pub fn pada_lengths(syllables: &[Syllable]) -> Vec<usize> {
    let Some(last) = syllables.last() else {
        return Vec::new();
    };

    if last.pada > 0 {
        let mut lengths = vec![0usize; last.pada + 1];
        for s in syllables {
            lengths[s.pada] += 1;
        }
        lengths.retain(|&n| n > 0);
        return lengths;
    }

    let first_word = syllables[0].word;
    let words = last.word - first_word + 1;
    if words < 4 {
        return vec![syllables.len()];
    }

    let group = (words / 4).max(1);
    let mut lengths = vec![0usize; words.div_ceil(group)];
    for s in syllables {
        lengths[(s.word - first_word) / group] += 1;
    }
    lengths.retain(|&n| n > 0);
    lengths
}
