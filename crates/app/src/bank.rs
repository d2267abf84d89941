use exam_core::model::{Question, QuestionError, QuestionId, QuestionSet};

/// Built-in practice questions. Longer tests cycle through them.
pub fn sample_questions() -> Result<QuestionSet, QuestionError> {
    let entries: [(u64, &str, [&str; 4], bool); 3] = [
        (
            1,
            "A particle moves with uniform velocity. Which of the following statements is correct?",
            [
                "The particle must be at rest",
                "The particle moves along a curved path",
                "The particle has zero acceleration",
                "The particle has constant speed only",
            ],
            false,
        ),
        (
            2,
            "What is the SI unit of electric charge?",
            ["Ampere", "Coulomb", "Volt", "Ohm"],
            false,
        ),
        (
            3,
            "In a double displacement reaction, which of the following occurs?",
            [
                "Two elements exchange their ions",
                "One element is displaced by another",
                "Decomposition of a compound",
                "Combination of two elements",
            ],
            true,
        ),
    ];

    let questions = entries
        .into_iter()
        .map(|(id, prompt, options, has_media)| {
            let options = options.iter().map(|label| (*label).to_string()).collect();
            Question::new(QuestionId::new(id), prompt, options, has_media)
        })
        .collect::<Result<Vec<_>, _>>()?;
    QuestionSet::new(questions)
}
