use ai_client::Message;
use chrono::NaiveDate;
use serde::Deserialize;

/// Onboarding answers that steer tone and depth.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Personalization {
    #[serde(default)]
    pub investment_goals: Vec<String>,
    pub financial_literacy: Option<String>,
    pub risk_tolerance: Option<String>,
}

impl Default for Personalization {
    fn default() -> Self {
        Self {
            investment_goals: Vec::new(),
            financial_literacy: Some("intermediate".to_string()),
            risk_tolerance: None,
        }
    }
}

impl Personalization {
    fn describe(&self) -> String {
        let goals = if self.investment_goals.is_empty() {
            "not specified".to_string()
        } else {
            self.investment_goals.join(", ")
        };
        let mut lines = vec![
            format!("Investment goals: {goals}"),
            format!(
                "Financial literacy: {}",
                self.financial_literacy.as_deref().unwrap_or("intermediate")
            ),
        ];
        if let Some(risk) = &self.risk_tolerance {
            lines.push(format!("Risk tolerance: {risk}"));
        }
        lines.join("\n")
    }
}

const SYSTEM_PROMPT: &str = "\
You are a financial news analyst writing a short daily briefing for one investor.

Output rules:
- Respond with a single JSON object and nothing else: {\"summary_text\": \"...\"}
- summary_text has exactly two paragraphs separated by a blank line.
- Each paragraph has 2-3 sentences. The whole summary is at most 150 words.
- Do not put citation markers such as [1] or (source) in the text.
- Use your built-in web search for today's news. Never invent sources, figures or quotes.
- Match the vocabulary to the investor's financial literacy.";

/// System and user messages for one summary request.
pub fn build_messages(
    portfolio: &str,
    personalization: &Personalization,
    today: NaiveDate,
) -> Vec<Message> {
    let user = format!(
        "Today is {date}.\n\n\
         Portfolio: {portfolio}\n\n\
         Investor profile:\n{profile}\n\n\
         Paragraph 1: the market and macro news from the last 24 hours that matters most to this portfolio.\n\
         Paragraph 2: what it means for these specific holdings and what to watch next.\n\n\
         Return only the JSON object.",
        date = today.format("%A, %B %-d, %Y"),
        profile = personalization.describe(),
    );
    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}
