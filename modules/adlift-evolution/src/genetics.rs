//! Crossover, mutation, and seeding of agent configurations.

use rand::seq::IndexedRandom;
use rand::Rng;

use adlift_common::{
    AdLiftError, AgentConfig, EvolutionMeta, LlmConfig, Personality, Strategy, Variant,
};

// Fixed pools for categorical and set-valued fields. Mutation draws from
// these; crossover falls back to them when both parents contribute nothing.
pub const TONES: &[&str] = &[
    "friendly",
    "professional",
    "enthusiastic",
    "consultative",
    "bold",
    "sophisticated",
    "playful",
];
pub const STYLES: &[&str] = &[
    "direct_sale",
    "education",
    "storytelling",
    "social_proof",
    "urgency",
    "value_focused",
    "luxury_positioning",
];
pub const TRAITS: &[&str] = &[
    "empathetic",
    "data-driven",
    "creative",
    "authentic",
    "confident",
    "humorous",
    "inspiring",
];
pub const OBJECTIVES: &[&str] = &[
    "maximize_conversions",
    "build_trust",
    "educate",
    "create_urgency",
    "showcase_value",
];
pub const TACTICS: &[&str] = &[
    "social_proof",
    "urgency",
    "value_focused",
    "storytelling",
    "data_driven",
    "emotional_appeal",
];

const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
const DEFAULT_MUTATION_RATE: f64 = 0.15;

// Temperature mutation bounds.
const TEMP_JITTER: f64 = 0.2;
const TEMP_MIN: f64 = 0.1;
const TEMP_MAX: f64 = 1.5;

// Set-valued fields carry between 2 and 4 elements.
const SET_MIN: usize = 2;
const SET_MAX: usize = 4;

/// One bred offspring: the configuration plus the mutation labels applied,
/// kept for the lineage record.
#[derive(Debug, Clone)]
pub struct Offspring {
    pub config: AgentConfig,
    pub parent_ids: [String; 2],
    pub mutations_applied: Vec<String>,
}

/// Seed a generation-0 configuration from the fixed pools.
pub fn random_config<R: Rng + ?Sized>(rng: &mut R, agent_type: &str) -> AgentConfig {
    let personality = Personality {
        tone: pool_draw(rng, TONES),
        style: pool_draw(rng, STYLES),
        traits: pool_sample(rng, TRAITS),
    };
    let strategy = Strategy {
        objective: pool_draw(rng, OBJECTIVES),
        tactics: pool_sample(rng, TACTICS),
        adaptation_rate: rng.random_range(0.2..=0.5),
    };
    let system_prompt = render_system_prompt(agent_type, &personality, &strategy);

    AgentConfig {
        personality,
        strategy,
        llm_config: LlmConfig {
            model: DEFAULT_MODEL.to_string(),
            system_prompt,
            temperature: 0.7,
            max_tokens: 2000,
        },
        evolution: EvolutionMeta {
            generation: 0,
            parent_ids: vec![],
            mutation_rate: DEFAULT_MUTATION_RATE,
            fitness_score: 0.0,
        },
    }
}

/// Combine two parent configurations into one offspring configuration.
///
/// Categorical fields pick one parent's value uniformly; set-valued fields
/// inherit from the deduplicated union; continuous fields take the mean;
/// max_tokens takes the minimum. The offspring's generation is
/// `max(parent generations) + 1`. The system prompt is left empty here:
/// it is derived state, rendered after mutation.
pub fn crossover<R: Rng + ?Sized>(
    rng: &mut R,
    p1: &AgentConfig,
    p2: &AgentConfig,
) -> AgentConfig {
    AgentConfig {
        personality: Personality {
            tone: pick(rng, &p1.personality.tone, &p2.personality.tone),
            style: pick(rng, &p1.personality.style, &p2.personality.style),
            traits: inherit_set(rng, &p1.personality.traits, &p2.personality.traits, TRAITS),
        },
        strategy: Strategy {
            objective: pick(rng, &p1.strategy.objective, &p2.strategy.objective),
            tactics: inherit_set(rng, &p1.strategy.tactics, &p2.strategy.tactics, TACTICS),
            adaptation_rate: (p1.strategy.adaptation_rate + p2.strategy.adaptation_rate) / 2.0,
        },
        llm_config: LlmConfig {
            model: p1.llm_config.model.clone(),
            system_prompt: String::new(),
            temperature: (p1.llm_config.temperature + p2.llm_config.temperature) / 2.0,
            // Conservative inheritance: the cheaper parent wins.
            max_tokens: p1.llm_config.max_tokens.min(p2.llm_config.max_tokens),
        },
        evolution: EvolutionMeta {
            generation: p1.evolution.generation.max(p2.evolution.generation) + 1,
            parent_ids: vec![],
            mutation_rate: 0.0,
            fitness_score: 0.0,
        },
    }
}

/// Apply per-field mutations, each independently with probability `rate`.
///
/// Returns the labels of the mutations applied, for the lineage record.
pub fn mutate<R: Rng + ?Sized>(rng: &mut R, config: &mut AgentConfig, rate: f64) -> Vec<String> {
    let rate = rate.clamp(0.0, 1.0);
    let mut applied = Vec::new();

    if rng.random_bool(rate) {
        let tone = pool_draw(rng, TONES);
        applied.push(format!("tone:{tone}"));
        config.personality.tone = tone;
    }

    if rng.random_bool(rate) {
        let style = pool_draw(rng, STYLES);
        applied.push(format!("style:{style}"));
        config.personality.style = style;
    }

    if rng.random_bool(rate) && !config.personality.traits.is_empty() {
        let idx = rng.random_range(0..config.personality.traits.len());
        let replacement = pool_draw(rng, TRAITS);
        applied.push(format!("trait:{replacement}"));
        config.personality.traits[idx] = replacement;
    }

    if rng.random_bool(rate) {
        let objective = pool_draw(rng, OBJECTIVES);
        applied.push(format!("objective:{objective}"));
        config.strategy.objective = objective;
    }

    if rng.random_bool(rate) && !config.strategy.tactics.is_empty() {
        let idx = rng.random_range(0..config.strategy.tactics.len());
        let replacement = pool_draw(rng, TACTICS);
        applied.push(format!("tactic:{replacement}"));
        config.strategy.tactics[idx] = replacement;
    }

    if rng.random_bool(rate) {
        let delta = rng.random_range(-TEMP_JITTER..=TEMP_JITTER);
        config.llm_config.temperature =
            (config.llm_config.temperature + delta).clamp(TEMP_MIN, TEMP_MAX);
        applied.push(format!("temperature:{delta:+.2}"));
    }

    applied
}

/// Breed one offspring from two distinct parent variants.
pub fn breed<R: Rng + ?Sized>(
    rng: &mut R,
    p1: &Variant,
    p2: &Variant,
    mutation_rate: f64,
) -> Result<Offspring, AdLiftError> {
    if p1.id == p2.id {
        return Err(AdLiftError::Validation(
            "breeding requires two distinct parents".to_string(),
        ));
    }

    let mut config = crossover(rng, &p1.agent_config, &p2.agent_config);
    let mutations_applied = mutate(rng, &mut config, mutation_rate);

    // Free text is derived, not inherited: re-render from the offspring's
    // own structured fields.
    config.llm_config.system_prompt =
        render_system_prompt(&p1.agent_type, &config.personality, &config.strategy);
    config.evolution.parent_ids = vec![p1.id.clone(), p2.id.clone()];
    config.evolution.mutation_rate = mutation_rate;

    Ok(Offspring {
        config,
        parent_ids: [p1.id.clone(), p2.id.clone()],
        mutations_applied,
    })
}

/// Breed a parent group sharing (agent_type, segment).
///
/// Produces `max(1, floor(group/2))` offspring, each from two distinct
/// parents drawn uniformly from the group. Fewer than 2 parents is a
/// validation error.
pub fn breed_group<R: Rng + ?Sized>(
    rng: &mut R,
    group: &[Variant],
    mutation_rate: f64,
) -> Result<Vec<Offspring>, AdLiftError> {
    if group.len() < 2 {
        return Err(AdLiftError::Validation(
            "at least two parents are required for breeding".to_string(),
        ));
    }

    let count = (group.len() / 2).max(1);
    let mut offspring = Vec::with_capacity(count);
    for _ in 0..count {
        let picked: Vec<&Variant> = group.choose_multiple(rng, 2).collect();
        offspring.push(breed(rng, picked[0], picked[1], mutation_rate)?);
    }
    Ok(offspring)
}

/// Render the system prompt from the structured fields.
pub fn render_system_prompt(
    agent_type: &str,
    personality: &Personality,
    strategy: &Strategy,
) -> String {
    let role = match agent_type {
        "landing_page" => "Generate compelling landing page content that adapts to visitor behavior.",
        "social_media" => "Create engaging social media ad content.",
        "placement" => "Decide optimal ad placement timing and targeting.",
        "visual" => "Generate specifications for visual content.",
        "ai_context" => "Optimize structured data for AI agents and scrapers.",
        _ => "Generate advertising content for your assigned channel.",
    };

    format!(
        "You are an AI advertising agent.\n\n\
         PERSONALITY:\n\
         - Tone: {}\n\
         - Style: {}\n\
         - Key Traits: {}\n\n\
         STRATEGY:\n\
         - Objective: {}\n\
         - Tactics: {}\n\n\
         YOUR ROLE: {}\n\n\
         ALWAYS stay in character and apply your tactics strategically.",
        personality.tone,
        personality.style,
        personality.traits.join(", "),
        strategy.objective,
        strategy.tactics.join(", "),
        role,
    )
}

fn pick<R: Rng + ?Sized>(rng: &mut R, a: &str, b: &str) -> String {
    if rng.random_bool(0.5) {
        a.to_string()
    } else {
        b.to_string()
    }
}

fn pool_draw<R: Rng + ?Sized>(rng: &mut R, pool: &[&str]) -> String {
    pool.choose(rng).copied().unwrap_or_default().to_string()
}

fn pool_sample<R: Rng + ?Sized>(rng: &mut R, pool: &[&str]) -> Vec<String> {
    let k = rng.random_range(SET_MIN..=SET_MAX.min(pool.len()));
    pool.choose_multiple(rng, k)
        .map(|s| s.to_string())
        .collect()
}

/// Inherit a set-valued field: sample without replacement from the
/// deduplicated union of both parents, size clamped to `[2, min(4, |union|)]`.
/// A union smaller than 2 is topped up from the fixed pool.
fn inherit_set<R: Rng + ?Sized>(
    rng: &mut R,
    a: &[String],
    b: &[String],
    pool: &[&str],
) -> Vec<String> {
    let mut union: Vec<String> = Vec::new();
    for item in a.iter().chain(b) {
        if !union.contains(item) {
            union.push(item.clone());
        }
    }

    let target = union.len().min(SET_MAX);
    let mut inherited: Vec<String> = union.choose_multiple(rng, target).cloned().collect();

    while inherited.len() < SET_MIN {
        let Some(extra) = pool.choose(rng) else {
            break;
        };
        let extra = extra.to_string();
        if !inherited.contains(&extra) {
            inherited.push(extra);
        }
    }

    inherited
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(generation: u32, temperature: f64, max_tokens: u32) -> AgentConfig {
        AgentConfig {
            personality: Personality {
                tone: "friendly".into(),
                style: "storytelling".into(),
                traits: vec!["empathetic".into(), "creative".into(), "authentic".into()],
            },
            strategy: Strategy {
                objective: "build_trust".into(),
                tactics: vec!["social_proof".into(), "urgency".into()],
                adaptation_rate: 0.4,
            },
            llm_config: LlmConfig {
                model: "gpt-4-turbo-preview".into(),
                system_prompt: "old prompt".into(),
                temperature,
                max_tokens,
            },
            evolution: EvolutionMeta {
                generation,
                parent_ids: vec![],
                mutation_rate: 0.15,
                fitness_score: 0.0,
            },
        }
    }

    fn variant(id: &str, generation: u32) -> Variant {
        Variant {
            id: id.into(),
            campaign_id: "c1".into(),
            segment: "human".into(),
            agent_type: "landing_page".into(),
            agent_config: config(generation, 0.7, 2000),
        }
    }

    #[test]
    fn crossover_bumps_generation_past_the_older_parent() {
        let mut rng = StdRng::seed_from_u64(1);
        let child = crossover(&mut rng, &config(3, 0.7, 2000), &config(5, 0.7, 2000));
        assert_eq!(child.evolution.generation, 6);
    }

    #[test]
    fn crossover_averages_continuous_fields_and_takes_min_tokens() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut p1 = config(0, 0.4, 3000);
        let mut p2 = config(0, 1.0, 1500);
        p1.strategy.adaptation_rate = 0.2;
        p2.strategy.adaptation_rate = 0.8;

        let child = crossover(&mut rng, &p1, &p2);
        assert!((child.llm_config.temperature - 0.7).abs() < 1e-12);
        assert_eq!(child.llm_config.max_tokens, 1500);
        assert!((child.strategy.adaptation_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn crossover_categoricals_come_from_a_parent() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p2 = config(0, 0.7, 2000);
        p2.personality.tone = "bold".into();
        p2.personality.style = "education".into();
        p2.strategy.objective = "educate".into();

        for _ in 0..50 {
            let child = crossover(&mut rng, &config(0, 0.7, 2000), &p2);
            assert!(["friendly", "bold"].contains(&child.personality.tone.as_str()));
            assert!(["storytelling", "education"].contains(&child.personality.style.as_str()));
            assert!(["build_trust", "educate"].contains(&child.strategy.objective.as_str()));
        }
    }

    #[test]
    fn inherited_sets_are_subsets_of_the_union_with_bounded_size() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut p2 = config(0, 0.7, 2000);
        p2.personality.traits = vec!["confident".into(), "humorous".into(), "inspiring".into()];

        for _ in 0..100 {
            let child = crossover(&mut rng, &config(0, 0.7, 2000), &p2);
            let union = [
                "empathetic",
                "creative",
                "authentic",
                "confident",
                "humorous",
                "inspiring",
            ];
            assert!((2..=4).contains(&child.personality.traits.len()));
            for t in &child.personality.traits {
                assert!(union.contains(&t.as_str()), "unexpected trait {t}");
            }
            // No duplicates: sampling is without replacement.
            let mut dedup = child.personality.traits.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), child.personality.traits.len());
        }
    }

    #[test]
    fn empty_union_falls_back_to_the_pool() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut p1 = config(0, 0.7, 2000);
        let mut p2 = config(0, 0.7, 2000);
        p1.personality.traits.clear();
        p2.personality.traits.clear();

        let child = crossover(&mut rng, &p1, &p2);
        assert_eq!(child.personality.traits.len(), 2);
        for t in &child.personality.traits {
            assert!(TRAITS.contains(&t.as_str()));
        }
    }

    #[test]
    fn zero_rate_mutation_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut child = config(1, 0.7, 2000);
        let before = child.clone();
        let applied = mutate(&mut rng, &mut child, 0.0);
        assert!(applied.is_empty());
        assert_eq!(child, before);
    }

    #[test]
    fn full_rate_mutation_touches_every_field_and_labels_it() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut child = config(1, 0.7, 2000);
        let applied = mutate(&mut rng, &mut child, 1.0);

        assert_eq!(applied.len(), 6);
        assert!(applied.iter().any(|m| m.starts_with("tone:")));
        assert!(applied.iter().any(|m| m.starts_with("style:")));
        assert!(applied.iter().any(|m| m.starts_with("trait:")));
        assert!(applied.iter().any(|m| m.starts_with("objective:")));
        assert!(applied.iter().any(|m| m.starts_with("tactic:")));
        assert!(applied.iter().any(|m| m.starts_with("temperature:")));
    }

    #[test]
    fn temperature_mutation_respects_clamp_bounds() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let mut low = config(1, 0.1, 2000);
            mutate(&mut rng, &mut low, 1.0);
            assert!(low.llm_config.temperature >= TEMP_MIN);

            let mut high = config(1, 1.5, 2000);
            mutate(&mut rng, &mut high, 1.0);
            assert!(high.llm_config.temperature <= TEMP_MAX);
        }
    }

    #[test]
    fn breed_rewrites_derived_and_provenance_fields() {
        let mut rng = StdRng::seed_from_u64(9);
        let p1 = variant("v1", 3);
        let p2 = variant("v2", 5);

        let offspring = breed(&mut rng, &p1, &p2, 0.15).unwrap();
        assert_eq!(offspring.parent_ids, ["v1".to_string(), "v2".to_string()]);
        assert_eq!(offspring.config.evolution.generation, 6);
        assert_eq!(
            offspring.config.evolution.parent_ids,
            vec!["v1".to_string(), "v2".to_string()]
        );
        assert_eq!(offspring.config.evolution.mutation_rate, 0.15);
        assert_eq!(offspring.config.evolution.fitness_score, 0.0);
        // Derived, not inherited.
        assert_ne!(offspring.config.llm_config.system_prompt, "old prompt");
        assert!(offspring
            .config
            .llm_config
            .system_prompt
            .contains(&offspring.config.personality.tone));
    }

    #[test]
    fn breeding_the_same_variant_twice_is_rejected() {
        let mut rng = StdRng::seed_from_u64(10);
        let p = variant("v1", 0);
        let err = breed(&mut rng, &p, &p, 0.15).unwrap_err();
        assert!(matches!(err, AdLiftError::Validation(_)));
    }

    #[test]
    fn group_offspring_counts_scale_with_group_size() {
        let mut rng = StdRng::seed_from_u64(11);

        let pair: Vec<Variant> = (0..2).map(|i| variant(&format!("v{i}"), 0)).collect();
        assert_eq!(breed_group(&mut rng, &pair, 0.15).unwrap().len(), 1);

        let five: Vec<Variant> = (0..5).map(|i| variant(&format!("v{i}"), 0)).collect();
        assert_eq!(breed_group(&mut rng, &five, 0.15).unwrap().len(), 2);

        let six: Vec<Variant> = (0..6).map(|i| variant(&format!("v{i}"), 0)).collect();
        assert_eq!(breed_group(&mut rng, &six, 0.15).unwrap().len(), 3);
    }

    #[test]
    fn undersized_groups_are_rejected() {
        let mut rng = StdRng::seed_from_u64(12);
        let solo = vec![variant("v0", 0)];
        let err = breed_group(&mut rng, &solo, 0.15).unwrap_err();
        assert!(matches!(err, AdLiftError::Validation(_)));
    }

    #[test]
    fn random_config_stays_inside_schema_bounds() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..50 {
            let cfg = random_config(&mut rng, "social_media");
            assert!(TONES.contains(&cfg.personality.tone.as_str()));
            assert!(STYLES.contains(&cfg.personality.style.as_str()));
            assert!((2..=4).contains(&cfg.personality.traits.len()));
            assert!((2..=4).contains(&cfg.strategy.tactics.len()));
            assert!((0.2..=0.5).contains(&cfg.strategy.adaptation_rate));
            assert_eq!(cfg.evolution.generation, 0);
            assert!(cfg.evolution.parent_ids.is_empty());
            assert!(cfg.llm_config.system_prompt.contains("social media"));
        }
    }
}
