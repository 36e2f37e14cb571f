//! Built-in mock collaborators.

use std::time::Duration;

use async_trait::async_trait;
use destiny_score::label_for;
use tracing::debug;

use crate::provider::{
    DestinyNarrator, GeneratedImage, Narrative, PartnerImageGenerator, Portrait, ProviderError,
    Vibe,
};

/// 1x1 PNG returned for every mock portrait.
const PLACEHOLDER_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Image generator that returns a fixed placeholder portrait.
#[derive(Debug, Clone, Default)]
pub struct MockImageGenerator {
    delay: Duration,
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PartnerImageGenerator for MockImageGenerator {
    fn name(&self) -> &'static str {
        "mock-image"
    }

    async fn generate(&self, portrait: &Portrait, vibe: Vibe) -> Result<GeneratedImage, ProviderError> {
        debug!(%vibe, portrait_bytes = portrait.data.len(), "mock partner image");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(GeneratedImage::DataUri(PLACEHOLDER_PNG.to_string()))
    }
}

/// Narrator that fills per-vibe templates.
#[derive(Debug, Clone, Default)]
pub struct MockNarrator {
    delay: Duration,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl DestinyNarrator for MockNarrator {
    fn name(&self) -> &'static str {
        "mock-narrator"
    }

    async fn narrate(&self, vibe: Vibe, score: u8) -> Result<Narrative, ProviderError> {
        debug!(%vibe, score, "mock narrative");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(mock_narrative(vibe, score))
    }
}

/// Template narrative for `vibe` at `score`.
pub fn mock_narrative(vibe: Vibe, score: u8) -> Narrative {
    let high = score >= 81;
    let template = template(vibe);
    let opening = if high { template.strong } else { template.soft };
    let partner_type = if high { template.type_high } else { template.type_low };

    Narrative {
        interpretation: format!("{} {opening} {}", template.lead, template.body),
        emotional_resonance: template.resonance.to_string(),
        communication_style: template.communication.to_string(),
        core_values: template.values.to_string(),
        partner_type: format!("{} · {partner_type}", label_for(score).title()),
    }
}

struct Template {
    lead: &'static str,
    strong: &'static str,
    soft: &'static str,
    body: &'static str,
    resonance: &'static str,
    communication: &'static str,
    values: &'static str,
    type_high: &'static str,
    type_low: &'static str,
}

fn template(vibe: Vibe) -> &'static Template {
    match vibe {
        Vibe::Gentle => &GENTLE,
        Vibe::Sunny => &SUNNY,
        Vibe::Intellectual => &INTELLECTUAL,
        Vibe::Mysterious => &MYSTERIOUS,
    }
}

static GENTLE: Template = Template {
    lead: "Your bond arrives like a spring breeze, soft and unhurried.",
    strong: "Your souls already hum in the same key, and",
    soft: "It may start quietly, yet",
    body: "their warmth will light your days like moonlight. You might meet on a still afternoon, and that calm flutter becomes a lasting memory.",
    resonance: "Their gentleness eases your weariness, and the safety you offer lets them bloom.",
    communication: "You listen well to each other; even silence carries understanding and patience.",
    values: "You both treasure sincere feeling and a warm home, finding joy in ordinary days.",
    type_high: "Soulmate",
    type_low: "Tender Confidant",
};

static SUNNY: Template = Template {
    lead: "Your meeting breaks through like sunlight through cloud.",
    strong: "It is fate at its kindest, and",
    soft: "It may look like chance, yet",
    body: "their energy will pull you toward new adventures. Perhaps you meet on a trail or a trip, and their bright smile is impossible to look away from.",
    resonance: "Their optimism lifts you, and your steadiness gives them somewhere to lean.",
    communication: "Conversation comes easily and laughter bridges every gap.",
    values: "You both love freedom and fresh experiences, which keeps the relationship alive.",
    type_high: "Sunlit Partner",
    type_low: "Spirited Companion",
};

static INTELLECTUAL: Template = Template {
    lead: "Your connection is built on ideas, like two books shelved side by side.",
    strong: "This is a meeting of minds at the deepest level, and",
    soft: "It may begin slowly, yet",
    body: "their quiet insight invites conversation far beyond the surface. A lecture or gallery could be where one long talk changes everything.",
    resonance: "You meet on a thoughtful plane, and every exchange of ideas leaves you both lighter.",
    communication: "You relish deep talks, from philosophy to art, and grow through each one.",
    values: "You both pursue wisdom and growth, valuing inner richness over outward show.",
    type_high: "Kindred Mind",
    type_low: "Thoughtful Partner",
};

static MYSTERIOUS: Template = Template {
    lead: "Your story carries an air of mystery, a riddle fate wrote just for you.",
    strong: "It feels like a meeting across time, and",
    soft: "Much is still unknown, yet",
    body: "their singular charm makes you want to explore. The encounter may be dramatic and unexpected, and life with them stays full of surprises.",
    resonance: "An attraction you cannot quite explain draws you together, deep and magnetic.",
    communication: "You speak in glances and hints; a single look can say everything.",
    values: "You both prize authenticity and an unconventional life, which sets your bond apart.",
    type_high: "Fated Enigma",
    type_low: "Mysterious Partner",
};
