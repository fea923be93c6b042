//! Default substitution tables, keyed by substituter name.

use crate::wordsub::WordSub;

pub const NORMAL: &str = "normal";
pub const GENDER: &str = "gender";
pub const PERSON: &str = "person";
pub const PERSON2: &str = "person2";

/// Swaps third-person singular pronouns between genders.
pub const DEFAULT_GENDER: &[(&str, &str)] = &[
    ("he", "she"),
    ("him", "her"),
    ("his", "her"),
    ("himself", "herself"),
    ("she", "he"),
    ("her", "him"),
    ("hers", "his"),
    ("herself", "himself"),
];

/// Swaps first and third person.
pub const DEFAULT_PERSON: &[(&str, &str)] = &[
    ("I", "he"),
    ("me", "him"),
    ("my", "his"),
    ("mine", "his"),
    ("myself", "himself"),
    ("he", "I"),
    ("him", "me"),
    ("his", "my"),
    ("himself", "myself"),
    ("she", "I"),
    ("her", "me"),
    ("hers", "mine"),
    ("herself", "myself"),
];

/// Swaps first and second person.
pub const DEFAULT_PERSON2: &[(&str, &str)] = &[
    ("I", "you"),
    ("me", "you"),
    ("my", "your"),
    ("mine", "yours"),
    ("myself", "yourself"),
    ("you", "me"),
    ("your", "my"),
    ("yours", "mine"),
    ("yourself", "myself"),
    ("I was", "he or she was"),
    ("I am", "you are"),
    ("you are", "I am"),
    ("you were", "I was"),
];

/// Expands contractions and common shorthand before matching.
pub const DEFAULT_NORMAL: &[(&str, &str)] = &[
    ("wanna", "want to"),
    ("gonna", "going to"),
    ("I'm", "I am"),
    ("I'd", "I would"),
    ("I'll", "I will"),
    ("I've", "I have"),
    ("you'd", "you would"),
    ("you're", "you are"),
    ("you've", "you have"),
    ("you'll", "you will"),
    ("he's", "he is"),
    ("he'd", "he would"),
    ("he'll", "he will"),
    ("she's", "she is"),
    ("she'd", "she would"),
    ("she'll", "she will"),
    ("we're", "we are"),
    ("we'd", "we would"),
    ("we'll", "we will"),
    ("we've", "we have"),
    ("they're", "they are"),
    ("they'd", "they would"),
    ("they'll", "they will"),
    ("they've", "they have"),
    ("y'all", "you all"),
    ("it's", "it is"),
    ("that's", "that is"),
    ("what's", "what is"),
    ("where's", "where is"),
    ("who's", "who is"),
    ("isn't", "is not"),
    ("aren't", "are not"),
    ("wasn't", "was not"),
    ("weren't", "were not"),
    ("don't", "do not"),
    ("doesn't", "does not"),
    ("didn't", "did not"),
    ("can't", "can not"),
    ("couldn't", "could not"),
    ("won't", "will not"),
    ("wouldn't", "would not"),
    ("shouldn't", "should not"),
    ("haven't", "have not"),
    ("hasn't", "has not"),
    ("let's", "let us"),
];

/// The default substituter for `name`, if there is one.
pub fn default_substituter(name: &str) -> Option<WordSub> {
    let table = match name {
        NORMAL => DEFAULT_NORMAL,
        GENDER => DEFAULT_GENDER,
        PERSON => DEFAULT_PERSON,
        PERSON2 => DEFAULT_PERSON2,
        _ => return None,
    };
    Some(WordSub::from_pairs(table.iter().copied()))
}
