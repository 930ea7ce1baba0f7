//! Prompt templates for the two model calls of a chat turn.
//!
//! The SQL prompt differs per [`PromptProfile`] (persona line and few-shot
//! exemplars); the answer prompt is shared. Rendering is a pure function of
//! its inputs.

use serde::{Deserialize, Serialize};

const SQL_TEMPLATE: &str = "You are {persona} at a company. You are interacting with a user who is asking you questions \
about the company's database. Based on the table schema below, write a SQL query that would answer the user's \
question. Take the conversation history into account.

<SCHEMA>{schema}</SCHEMA>
Conversation History: {chat_history}
Write only the SQL query and nothing else. Do not wrap the SQL query in any other text, not even backticks.

For example:
{examples}

Your turn:
Question: {question}
SQL Query:
";

const ANSWER_TEMPLATE: &str = "You are a data analyst at a company. You are interacting with a user who is asking you questions \
about the company's database.
Based on the table schema below, question, SQL query , write a natural language response.

<SCHEMA>{schema}</SCHEMA>
Conversation History: {chat_history}
SQL Query: <SQL>{query}</SQL>
Question: {question}
SQL Response: {response}";

/// A worked question/SQL pair embedded in the SQL prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exemplar {
    pub question: &'static str,
    pub sql: &'static str,
}

const SUICIDES_EXEMPLARS: &[Exemplar] = &[
    Exemplar {
        question: "Count the total number of entries in the dataset.",
        sql: "SELECT COUNT(*) AS total_entries FROM suicides_data;",
    },
    Exemplar {
        question: "State-wise Analysis:Count the number of suicides in each state.",
        sql: "SELECT State, COUNT(*) AS total_suicides FROM suicides_data GROUP BY State;",
    },
    Exemplar {
        question: "Year-wise Analysis:Count the number of suicides each year.",
        sql: "SELECT Year, COUNT(*) AS total_suicides FROM suicides_data GROUP BY Year;",
    },
    Exemplar {
        question: "Type-wise Analysis:Count the number of suicides based on different types.",
        sql: "SELECT Type, COUNT(*) AS total_suicides FROM suicides_data GROUP BY Type;",
    },
    Exemplar {
        question: "Gender-wise Analysis:Count the number of suicides based on gender.",
        sql: "SELECT Gender, COUNT(*) AS total_suicides FROM suicides_data GROUP BY Gender;",
    },
    Exemplar {
        question: "Specific State and Year Analysis:Count the number of suicides in a specific state and year.",
        sql: "SELECT State, Year, COUNT(*) AS total_suicides FROM suicides_data GROUP BY State, Year;",
    },
];

const FDA_EXEMPLARS: &[Exemplar] = &[
    Exemplar {
        question: "Count the total number of entries in the combined dataset.",
        sql: "SELECT COUNT(*) AS total_entries FROM table1 t1 JOIN table2 t2 ON t1.application_number = t2.application_number;",
    },
    Exemplar {
        question: "Count the number of unique brand names in the combined dataset.",
        sql: "SELECT COUNT(DISTINCT t1.brand_name) AS unique_brands FROM table1 t1 JOIN table2 t2 ON t1.application_number = t2.application_number;",
    },
    Exemplar {
        question: "List all brand names along with their total number of submissions in the combined dataset.",
        sql: "SELECT t1.brand_name, COUNT(*) AS total_submissions FROM table1 t1 JOIN table2 t2 ON t1.application_number = t2.application_number GROUP BY t1.brand_name;",
    },
    Exemplar {
        question: "Show the most recent submission date for each brand in the combined dataset.",
        sql: "SELECT t1.brand_name, MAX(t2.submission_status_date) AS most_recent_submission_date FROM table1 t1 JOIN table2 t2 ON t1.application_number = t2.application_number GROUP BY t1.brand_name;",
    },
    Exemplar {
        question: "List all sponsor names along with the count of unique brand names they sponsored in the combined dataset.",
        sql: "SELECT t1.sponsor_name, COUNT(DISTINCT t1.brand_name) AS unique_brands_sponsored FROM table1 t1 JOIN table2 t2 ON t1.application_number = t2.application_number GROUP BY t1.sponsor_name;",
    },
    Exemplar {
        question: "Show the top 5 sponsor names with the highest number of submissions in the combined dataset.",
        sql: "SELECT t1.sponsor_name, COUNT(*) AS submission_count FROM table1 t1 JOIN table2 t2 ON t1.application_number = t2.application_number GROUP BY t1.sponsor_name ORDER BY submission_count DESC LIMIT 5;",
    },
    Exemplar {
        question: "Show the submission type with the highest number of submissions in the combined dataset.",
        sql: "SELECT t2.submission_type, COUNT(*) AS submission_count FROM table1 t1 JOIN table2 t2 ON t1.application_number = t2.application_number GROUP BY t2.submission_type ORDER BY submission_count DESC LIMIT 1;",
    },
];

/// Which dataset and persona the SQL prompt is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptProfile {
    /// Suicide statistics table, no website scraping.
    #[default]
    Suicides,
    /// FDA submissions across two joined tables, with website scraping.
    Fda,
    /// Suicide statistics with a SQL-developer persona, with website scraping.
    WebSql,
}

impl std::fmt::Display for PromptProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PromptProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptProfile::Suicides => "suicides",
            PromptProfile::Fda => "fda",
            PromptProfile::WebSql => "web-sql",
        }
    }

    /// Persona line of the SQL prompt. The scraping profiles carry a trailing
    /// space, so their prompts read `a Data analyst  at`.
    pub fn persona(&self) -> &'static str {
        match self {
            PromptProfile::Suicides => "a data analyst",
            PromptProfile::Fda => "a Data analyst ",
            PromptProfile::WebSql => "a SQL developer ",
        }
    }

    pub fn exemplars(&self) -> &'static [Exemplar] {
        match self {
            PromptProfile::Suicides | PromptProfile::WebSql => SUICIDES_EXEMPLARS,
            PromptProfile::Fda => FDA_EXEMPLARS,
        }
    }

    pub fn default_database(&self) -> &'static str {
        match self {
            PromptProfile::Suicides | PromptProfile::WebSql => "sucides",
            PromptProfile::Fda => "fda",
        }
    }

    /// Whether the connection form offers a website URL.
    pub fn scrapes_website(&self) -> bool {
        !matches!(self, PromptProfile::Suicides)
    }

    /// Prompt asking the model for a bare SQL statement.
    pub fn sql_prompt(&self, schema: &str, chat_history: &str, question: &str) -> String {
        let examples = self
            .exemplars()
            .iter()
            .map(|e| format!("Question: {}\nSQL Query: {}", e.question, e.sql))
            .collect::<Vec<_>>()
            .join("\n\n");

        render(
            SQL_TEMPLATE,
            &[
                ("persona", self.persona()),
                ("schema", schema),
                ("chat_history", chat_history),
                ("examples", &examples),
                ("question", question),
            ],
        )
    }

    /// Prompt asking the model to phrase the query result as an answer.
    pub fn answer_prompt(
        &self,
        schema: &str,
        chat_history: &str,
        query: &str,
        question: &str,
        response: &str,
    ) -> String {
        render(
            ANSWER_TEMPLATE,
            &[
                ("schema", schema),
                ("chat_history", chat_history),
                ("query", query),
                ("question", question),
                ("response", response),
            ],
        )
    }
}

/// Single-pass `{name}` substitution. Substituted values are never rescanned,
/// so user text containing braces is inserted literally.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let value = after
            .find('}')
            .and_then(|end| vars.iter().find(|(k, _)| *k == &after[..end]).map(|(_, v)| (end, v)));
        match value {
            Some((end, v)) => {
                out.push_str(v);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
