//! Prompt Builder System
//!
//! Standardized prompt construction for the research and drafting calls.
//!
//! ## Design Principles
//!
//! 1. **Role Definition**: Clear AI role and audience for each call
//! 2. **Structured Objectives**: Numbered goals
//! 3. **Output Format**: Line markers the parser relies on
//! 4. **Anti-Patterns**: Explicit things the model must not emit

use chrono::{DateTime, Utc};

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Bullet list wrapped in an XML-style tag
    Tagged { tag: String, items: Vec<String> },
    /// Focus enforcement with restrictions
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
    /// Anti-patterns the model must avoid
    AntiPatterns(Vec<String>),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add a `- item` list inside `<tag>...</tag>`
    pub fn tagged_list(mut self, tag: &str, items: &[String]) -> Self {
        self.sections.push(PromptSection::Tagged {
            tag: tag.to_string(),
            items: items.to_vec(),
        });
        self
    }

    /// Add focus enforcement section
    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Add anti-patterns section
    pub fn anti_patterns(mut self, bad: Vec<&str>) -> Self {
        self.sections.push(PromptSection::AntiPatterns(
            bad.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("## {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Tagged { tag, items } => {
                    prompt.push_str(&format!("<{}>\n", tag));
                    for item in items {
                        prompt.push_str(&format!("- {}\n", item));
                    }
                    prompt.push_str(&format!("</{}>\n\n", tag));
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str("<FOCUS>\n");
                    prompt.push_str(&format!("IMPORTANT: Focus EXCLUSIVELY on: {}\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
                PromptSection::AntiPatterns(bad) => {
                    prompt.push_str("<what_not_to_do>\n");
                    for example in bad {
                        prompt.push_str(&format!("DO NOT: {}\n", example));
                    }
                    prompt.push_str("</what_not_to_do>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

const AUDIENCE: &str = "K-12 teachers, principals, and school administrators";

const RESEARCH_FORMAT: &str = "\
- Each learning is a DETAILED insight, definition, practical strategy, statistic, or challenge/solution (3-5 sentences with specific details).
- Provide at least 20-25 distinct learnings covering different facets of the topic.
- Prefix each learning CLEARLY with \"LEARNING: \".
- List every source URL used, prefixed with \"SOURCE_URL: \".
- On the line IMMEDIATELY BEFORE each source URL give a concise title prefixed with \"SOURCE_TITLE: \".
- Prefer diverse, authoritative sources: educational websites, journals, professional organizations, government resources.";

const RESEARCH_EXAMPLE: &str = "\
SOURCE_TITLE: Edutopia - Comprehensive Guide to Collaborative Learning Implementation
SOURCE_URL: https://www.edutopia.org/collaborative-learning-benefits
LEARNING: Collaborative learning helps students develop higher-level thinking, communication, and leadership skills. Structured protocols such as Think-Pair-Share and Jigsaw keep every student engaged, and elementary teachers report the best results with groups of 3-4 students with defined roles.
SOURCE_TITLE: ASCD - Structuring and Supporting Collaborative Learning
SOURCE_URL: https://www.ascd.org/el/articles/structuring-group-work
LEARNING: Principals support collaborative learning by funding targeted professional development and protecting weekly team planning time for teachers to co-design group activities.";

const ARTICLE_STRUCTURE: &str = "\
# [Comprehensive and Engaging Title Relevant to Educators]

## Introduction
(Hook on a real challenge or opportunity for educators, why the topic matters now, preview of the sections.)

## [Understanding Key Concepts]
(Core ideas and terminology with examples from primary and secondary settings, using ### subsections.)

## [Implementation Strategies for Classroom Teachers]
(Step-by-step guidance with timeframes, resources, grade-level adaptations, and assessment methods.)

## [Leadership Framework for School Administrators]
(Policy, professional development, resource allocation, and monitoring of implementation.)

## [Addressing Implementation Challenges]
(Common obstacles with multiple evidence-based solutions each.)

## [Future Directions]
(Emerging developments and how the practice is likely to evolve.)

## Conclusion
(Actionable takeaways per role and a call to action focused on student outcomes.)";

/// Preset prompt templates for the workflow's generation steps
pub struct PromptTemplates;

impl PromptTemplates {
    /// Research prompt for the grounded-search step
    pub fn research(topic: &str, current_date: &str) -> String {
        PromptBuilder::new()
            .text(&format!(
                "[GOOGLE SEARCH REQUEST] {} in education comprehensive guide\n\nToday's date is {}.",
                topic, current_date
            ))
            .role(
                "AI research assistant",
                &format!("gathering information about \"{}\" for {}", topic, AUDIENCE),
            )
            .objectives(vec![
                "Core concepts and definitions relevant to educators",
                "Practical classroom implementation strategies for teachers",
                "Leadership considerations for principals and administrators",
                "Research findings on student outcomes and engagement",
                "Challenges in schools and evidence-based solutions",
                "Grade-level and subject-area specific applications",
                "Equity considerations and inclusive practices",
                "Assessment methods and long-term sustainability",
            ])
            .section(
                &format!("Current Trends (as of {})", current_date),
                "Use real-time Google Search and include the most recent developments.",
            )
            .section("Response Format (strictly adhere to this)", RESEARCH_FORMAT)
            .section("Example", RESEARCH_EXAMPLE)
            .build()
    }

    /// Drafting prompt for the long-form writing step
    pub fn article(topic: &str, learnings: &[String], current_date: &str) -> String {
        PromptBuilder::new()
            .role(
                "educational writer",
                &format!("comprehensive, practical articles for {}", AUDIENCE),
            )
            .text(&format!(
                "Today's date is {}.\n\nWrite an EXTENSIVE educational article (minimum 2000-2500 words) on the topic: \"{}\".\n\nWrite the entire article in Markdown.",
                current_date, topic
            ))
            .focus(
                "the key learnings below",
                vec![
                    "Base the article exclusively on these learnings",
                    "Expand each learning with context and specific implementation examples",
                    "Do not introduce information the learnings do not support",
                ],
            )
            .tagged_list("learnings", learnings)
            .section("Article Structure", ARTICLE_STRUCTURE)
            .anti_patterns(vec![
                "include a \"Sources\" or \"References\" section",
                "add meta-commentary before the title or after the conclusion",
                "start with anything other than the Markdown title line (`# Title`)",
            ])
            .build()
    }
}

/// Format a date the way prompts expect it, e.g. "October 16, 2026".
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn current_date() -> String {
    format_date(Utc::now())
}
