use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data_source::DataSource;
use crate::session::NewMessage;

/// The three assistant surfaces. Each has its own reply rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    /// General chat over a data source.
    #[default]
    Core,
    /// Chat about uploaded documents.
    Docs,
    /// Data-visualization chat; every answer comes with a chart.
    Insights,
}

pub const UPLOAD_FIRST_REPLY: &str =
    "Please upload some documents first so I can analyze them and answer your questions.";

pub const CANNED_PARAGRAPHS: [&str; 5] = [
    "Based on the sales data analyzed from the last quarter, New York continues to be our strongest market with $1.2M in sales, followed by San Francisco with $950K. The most significant growth was observed in Austin at 15.3%, suggesting we should consider expanding our presence there. Miami and New York also showed strong growth at 11.1% and 12.5% respectively.",
    "The customer satisfaction survey results indicate an overall satisfaction score of 8.7/10, a 0.5 point improvement from the previous quarter. Key areas of improvement cited by customers include product quality (9.2/10) and customer service responsiveness (8.9/10). Areas requiring attention include the checkout process (7.5/10) and website navigation (7.8/10).",
    "Financial analysis reveals that our profit margins have increased by 2.3% this quarter due to successful cost-cutting measures and optimized supply chain operations. The ROI on our digital marketing campaigns has improved to 320%, with social media campaigns performing particularly well at 410% ROI. We recommend increasing budget allocation to Instagram and TikTok campaigns by 15% for the next quarter.",
    "Market research indicates growing demand for our premium product line, with a 28% increase in searches and a 32% increase in conversion rates for these products. The demographic most interested in our premium offerings is 28-42 year old professionals in urban areas. We recommend developing three new premium products for this demographic by Q3.",
    "Inventory analysis shows that we're overstocked on Product Category B by approximately 22%, while Product Category D is frequently out of stock (stockout rate of 15%). Implementing an improved inventory forecasting system could reduce carrying costs by an estimated $120K annually while improving product availability and customer satisfaction.",
];

/// Titles the docs assistant cites as its source.
pub const REFERENCE_DOCUMENTS: [&str; 8] = [
    "Annual Report 2023",
    "Marketing Strategy",
    "Financial Statement Q4",
    "Product Roadmap",
    "Customer Feedback Summary",
    "Employee Handbook",
    "Sales Projections 2024",
    "Brand Guidelines",
];

pub const SAMPLE_QUERIES: [&str; 5] = [
    "Show me sales data by city",
    "Compare Q1 vs Q2 revenue",
    "What were our top performing products last month?",
    "Summarize customer feedback trends",
    "Show marketing campaign performance",
];

const GRAPH_TRIGGERS: &[&str] = &["chart", "graph", "visualization", "data"];
const TABLE_TRIGGERS: &[&str] = &["table", "document"];
const PARAGRAPH_TRIGGERS: &[(&str, usize)] = &[("sales", 0), ("trend", 2), ("compare", 3)];

#[derive(Debug, Clone)]
pub struct ReplyRequest<'a> {
    pub feature: Feature,
    pub text: &'a str,
    pub source: &'a DataSource,
    pub document_count: usize,
    pub uploading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub show_graph: bool,
    pub show_table: bool,
    pub document_reference: Option<String>,
    /// The docs assistant had nothing to read; callers use the shorter delay.
    pub needs_documents: bool,
    pub notice_title: String,
    pub notice_message: String,
}

impl Reply {
    pub fn to_message(&self) -> NewMessage {
        NewMessage::bot(self.content.clone())
            .with_graph(self.show_graph)
            .with_table(self.show_table)
            .with_reference(self.document_reference.clone())
    }
}

fn mentions_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Decides the canned answer. The only source of variation is `rng`, and it
/// is consulted only when no keyword settles the choice.
pub fn generate_reply<R: Rng>(req: &ReplyRequest<'_>, rng: &mut R) -> Reply {
    let lowered = req.text.to_lowercase();
    match req.feature {
        Feature::Docs if req.document_count == 0 && !req.uploading => Reply {
            content: UPLOAD_FIRST_REPLY.to_string(),
            show_graph: false,
            show_table: false,
            document_reference: None,
            needs_documents: true,
            notice_title: "No documents available".into(),
            notice_message: "Please upload documents to analyze.".into(),
        },
        Feature::Core => Reply {
            content: format!(
                "I've analyzed your query about \"{}\" using the {} data source. Here's what I found...",
                req.text, req.source.name
            ),
            show_graph: mentions_any(&lowered, GRAPH_TRIGGERS) || rng.random_bool(0.5),
            show_table: false,
            document_reference: None,
            needs_documents: false,
            notice_title: "Response generated".into(),
            notice_message: format!("Query processed using {}", req.source.name),
        },
        Feature::Docs => {
            let show_table = mentions_any(&lowered, TABLE_TRIGGERS) || rng.random_bool(0.5);
            let reference = REFERENCE_DOCUMENTS[rng.random_range(0..REFERENCE_DOCUMENTS.len())];
            Reply {
                content: format!(
                    "I've analyzed your documents regarding \"{}\" and here's what I found...",
                    req.text
                ),
                show_graph: false,
                show_table,
                document_reference: Some(reference.to_string()),
                needs_documents: false,
                notice_title: "Response generated".into(),
                notice_message: format!(
                    "We've analyzed your documents using {} and provided the results.",
                    req.source.name
                ),
            }
        }
        Feature::Insights => {
            let idx = PARAGRAPH_TRIGGERS
                .iter()
                .find(|(word, _)| lowered.contains(word))
                .map(|(_, idx)| *idx)
                .unwrap_or_else(|| rng.random_range(0..CANNED_PARAGRAPHS.len()));
            Reply {
                content: CANNED_PARAGRAPHS[idx].to_string(),
                show_graph: true,
                show_table: false,
                document_reference: None,
                needs_documents: false,
                notice_title: "Visualization generated".into(),
                notice_message: "We've processed your query and created the visualization.".into(),
            }
        }
    }
}
