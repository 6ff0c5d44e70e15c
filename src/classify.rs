use crate::profile::Profile;

/// Returned when no answered question contributed any score.
pub const DEFAULT_PROFILE: Profile = Profile::Adhd;

#[derive(Debug, Clone, PartialEq)]
pub struct QuizOption {
    pub text: String,
    /// Empty for probe options and for options that carry no scoring map.
    pub weights: Vec<(Profile, u32)>,
    /// Only meaningful on the accessibility probe.
    pub color_blind: Option<bool>,
}

impl QuizOption {
    pub fn scored(text: &str, weights: &[(Profile, u32)]) -> Self {
        Self {
            text: text.to_owned(),
            weights: weights.to_vec(),
            color_blind: None,
        }
    }

    pub fn probe(text: &str, color_blind: bool) -> Self {
        Self {
            text: text.to_owned(),
            weights: Vec::new(),
            color_blind: Some(color_blind),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    /// Answering the probe finalizes classification immediately.
    pub probe: bool,
    pub options: Vec<QuizOption>,
}

/// Running per-profile totals.
///
/// Entries keep the order in which each profile first received a weight; that
/// order is the tie-break: a later profile only takes the lead with a strictly
/// greater total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard {
    entries: Vec<(Profile, u32)>,
}

impl Scoreboard {
    pub fn add(&mut self, profile: Profile, weight: u32) {
        match self.entries.iter_mut().find(|(p, _)| *p == profile) {
            Some((_, total)) => *total = total.saturating_add(weight),
            None => self.entries.push((profile, weight)),
        }
    }

    pub fn score(&self, profile: Profile) -> u32 {
        self.entries
            .iter()
            .find(|(p, _)| *p == profile)
            .map(|(_, total)| *total)
            .unwrap_or(0)
    }

    pub fn entries(&self) -> &[(Profile, u32)] {
        &self.entries
    }

    pub fn winner(&self) -> Profile {
        let mut best = 0u32;
        let mut winner = DEFAULT_PROFILE;
        for (profile, total) in &self.entries {
            if *total > best {
                best = *total;
                winner = *profile;
            }
        }
        winner
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub profile: Profile,
    pub color_blind: bool,
    pub scores: Scoreboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizStep {
    Next { step: usize },
    Finished(Classification),
}

/// One run of the sorting ceremony. Dropping it discards the scores.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    step: usize,
    scores: Scoreboard,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            step: 0,
            scores: Scoreboard::default(),
        }
    }

    pub fn sorting_ceremony() -> Self {
        Self::new(sorting_ceremony())
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.step)
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    /// Records the chosen option for the current question.
    ///
    /// An index with no matching option contributes nothing and still advances.
    pub fn choose(&mut self, option_index: usize) -> QuizStep {
        let Some(question) = self.questions.get(self.step) else {
            return QuizStep::Finished(self.finish(false));
        };
        let option = question.options.get(option_index);
        if option.is_none() {
            tracing::warn!(
                step = self.step,
                option_index,
                "quiz option out of range; counting as zero"
            );
        }

        if question.probe {
            let color_blind = option.and_then(|o| o.color_blind).unwrap_or(false);
            return QuizStep::Finished(self.finish(color_blind));
        }

        if let Some(option) = option {
            for (profile, weight) in &option.weights {
                self.scores.add(*profile, *weight);
            }
        }

        self.step += 1;
        if self.step < self.questions.len() {
            QuizStep::Next { step: self.step }
        } else {
            QuizStep::Finished(self.finish(false))
        }
    }

    pub fn finish(&self, color_blind: bool) -> Classification {
        let classification = Classification {
            profile: self.scores.winner(),
            color_blind,
            scores: self.scores.clone(),
        };
        tracing::debug!(
            profile = %classification.profile,
            color_blind,
            scores = ?classification.scores.entries(),
            "quiz finished"
        );
        classification
    }
}

/// Runs a whole answer sequence. Answers beyond the final question are ignored;
/// a sequence that stops early is finalized with the scores so far.
pub fn classify(questions: &[Question], choices: &[usize]) -> Classification {
    let mut quiz = QuizSession::new(questions.to_vec());
    for choice in choices {
        if let QuizStep::Finished(classification) = quiz.choose(*choice) {
            return classification;
        }
    }
    quiz.finish(false)
}

/// The built-in five-question quiz: four scored questions, then the colorblind probe.
pub fn sorting_ceremony() -> Vec<Question> {
    use Profile::{Adhd, Autism, Dyscalculia, Dyslexia, Ell};

    vec![
        Question {
            text: "When you try to read a spellbook (or textbook), what happens?".to_owned(),
            probe: false,
            options: vec![
                QuizOption::scored("The words dance, blur, or flip around.", &[(Dyslexia, 3)]),
                QuizOption::scored(
                    "I can read, but I get bored and lose focus quickly.",
                    &[(Adhd, 2)],
                ),
                QuizOption::scored(
                    "The words are fine, but I don't understand the hidden meanings.",
                    &[(Ell, 2), (Autism, 1)],
                ),
            ],
        },
        Question {
            text: "How do you handle complex potions (math problems)?".to_owned(),
            probe: false,
            options: vec![
                QuizOption::scored("I love the logic and rules!", &[(Autism, 1)]),
                QuizOption::scored(
                    "The numbers get jumbled up in my head.",
                    &[(Dyscalculia, 3)],
                ),
                QuizOption::scored(
                    "I skip steps because I want to finish fast.",
                    &[(Adhd, 2)],
                ),
            ],
        },
        Question {
            text: "What helps you learn new magic best?".to_owned(),
            probe: false,
            options: vec![
                QuizOption::scored(
                    "Pictures, diagrams, and videos.",
                    &[(Dyslexia, 1), (Ell, 2)],
                ),
                QuizOption::scored("Short bursts of practice with rewards.", &[(Adhd, 3)]),
                QuizOption::scored(
                    "Clear, logical instructions with no fluff.",
                    &[(Autism, 2), (Dyscalculia, 1)],
                ),
            ],
        },
        Question {
            text: "Does 'It's raining cats and dogs' make sense to you?".to_owned(),
            probe: false,
            options: vec![
                QuizOption::scored(
                    "No! Why would animals fall from the sky?",
                    &[(Autism, 2), (Ell, 2)],
                ),
                QuizOption::scored("Yes, I know it just means heavy rain.", &[(Adhd, 1)]),
            ],
        },
        Question {
            text: "Do some magical colors look the same to you (like red/green)?".to_owned(),
            probe: true,
            options: vec![
                QuizOption::probe("Yes, sometimes colors blend together.", true),
                QuizOption::probe("No, I see all colors clearly.", false),
            ],
        },
    ]
}
