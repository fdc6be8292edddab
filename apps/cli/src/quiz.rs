use anyhow::Result;
use console::{Term, style};
use konspekt_core::{Quiz, StudyClient, types::QuizQuestion};

/// Parse a 1-based option choice.
fn parse_choice(input: &str, options: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=options).contains(&n).then(|| n - 1)
}

/// Questions that can actually be answered, with their quiz index.
fn answerable(quiz: &Quiz) -> impl Iterator<Item = (usize, &QuizQuestion)> {
    quiz.questions
        .iter()
        .enumerate()
        .filter(|(_, q)| !q.options.is_empty())
}

fn ask(term: &Term, index: usize, question: &QuizQuestion) -> Result<usize> {
    term.write_line(&format!(
        "\n{} {} {}",
        style(format!("Q{}.", index + 1)).cyan().bold(),
        question.question,
        style(format!("({})", question.difficulty)).dim()
    ))?;
    for (i, option) in question.options.iter().enumerate() {
        term.write_line(&format!("  {}. {}", i + 1, option))?;
    }

    loop {
        term.write_str("> ")?;
        let line = term.read_line()?;
        if let Some(choice) = parse_choice(&line, question.options.len()) {
            return Ok(choice);
        }
        term.write_line(&format!(
            "{} pick a number between 1 and {}",
            style("?").yellow(),
            question.options.len()
        ))?;
    }
}

/// Walk the generated quiz on the terminal, then offer retakes.
pub fn take_quiz(client: &mut StudyClient) -> Result<()> {
    let Some(quiz) = client.session().quiz.clone() else {
        return Ok(());
    };
    let term = Term::stdout();

    loop {
        for (i, question) in answerable(&quiz) {
            let choice = ask(&term, i, question)?;
            client.answer_question(i, choice);
        }
        let score = client.submit_quiz()?;

        term.write_line("")?;
        for (i, question) in answerable(&quiz) {
            let picked = client.session().quiz_attempt.answer_for(i);
            let mark = if picked == Some(question.correct_answer) {
                style("✓").green().bold()
            } else {
                style("✘").red().bold()
            };
            term.write_line(&format!("{} Q{}: {}", mark, i + 1, question.explanation))?;
        }
        term.write_line(&format!(
            "\n{} {}",
            style("Score:").dim(),
            style(format!("{score}%")).cyan().bold()
        ))?;

        term.write_str("Retake? [y/N] ")?;
        if !term.read_line()?.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }
        client.retake_quiz();
    }
}
