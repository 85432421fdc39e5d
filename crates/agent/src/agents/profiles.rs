//! Built-in agent profiles.

use verdant_core::agent::{AgentProfile, Capability, CapabilitySet, KeywordGroup};

fn caps(list: &[Capability]) -> CapabilitySet {
    list.iter().copied().collect()
}

pub fn garden_consultant() -> AgentProfile {
    AgentProfile {
        id: "garden_consultant".into(),
        name: "Garden Consultant".into(),
        description: "Plant choice, care schedules and general gardening advice".into(),
        capabilities: caps(&[
            Capability::Consultation,
            Capability::TextGeneration,
            Capability::PlantCare,
        ]),
        system_prompt: "You are an experienced garden consultant. Give practical, \
            climate-aware advice on choosing and caring for plants. Prefer concrete \
            species, quantities and timings over generalities."
            .into(),
        keywords: vec![
            KeywordGroup::new(
                "plants",
                &[
                    "растени", "цвет", "роза", "пион", "хоста", "туя", "кустарник", "дерев",
                    "газон", "plant", "flower", "rose", "peony", "hosta", "shrub", "tree", "lawn",
                ],
            ),
            KeywordGroup::new(
                "care",
                &[
                    "полив", "удобрен", "обрезк", "посад", "зимовк", "уход", "water", "fertiliz",
                    "prune", "planting", "winter", "care",
                ],
            ),
            KeywordGroup::new(
                "conditions",
                &["тень", "тени", "солнц", "почв", "климат", "shade", "sun", "soil", "climate"],
            ),
        ],
    }
}

pub fn landscape_designer() -> AgentProfile {
    AgentProfile {
        id: "landscape_designer".into(),
        name: "Landscape Designer".into(),
        description: "Design concepts, visualizations and planting plans".into(),
        capabilities: caps(&[
            Capability::ImageGeneration,
            Capability::TextGeneration,
            Capability::LandscapeDesign,
        ]),
        system_prompt: "You are a landscape designer. Propose coherent garden layouts \
            with zones, paths, planting groups and materials. When asked for a \
            visualization, describe it precisely enough to render."
            .into(),
        keywords: vec![
            KeywordGroup::new(
                "design",
                &[
                    "дизайн", "ландшафт", "проект", "стиль", "клумб", "зонирован", "design",
                    "landscape", "layout", "style", "flowerbed", "zoning",
                ],
            ),
            KeywordGroup::new(
                "visualization",
                &[
                    "визуализ", "нарисуй", "покажи", "эскиз", "картинк", "visualiz", "draw",
                    "render", "sketch", "picture",
                ],
            ),
            KeywordGroup::new(
                "structures",
                &[
                    "дорожк", "пергол", "беседк", "пруд", "терраса", "path", "pergola",
                    "gazebo", "pond", "terrace", "patio",
                ],
            ),
        ],
    }
}

pub fn site_analyst() -> AgentProfile {
    AgentProfile {
        id: "site_analyst".into(),
        name: "Site Analyst".into(),
        description: "Reads photos of a plot: light, soil, slope, plant health".into(),
        capabilities: caps(&[
            Capability::Analysis,
            Capability::ImageAnalysis,
            Capability::SiteAssessment,
            Capability::PlantCare,
        ]),
        system_prompt: "You analyse photos of gardens and plots. Describe what you see: \
            orientation and light, soil and drainage clues, existing plants and their \
            condition, problems and their likely causes. Be specific about which photo \
            you are referring to."
            .into(),
        keywords: vec![
            KeywordGroup::new(
                "analysis",
                &[
                    "анализ", "проанализируй", "оцени", "посмотри", "фото", "снимок",
                    "analyze", "analyse", "assess", "look at", "photo",
                ],
            ),
            KeywordGroup::new(
                "site",
                &["участок", "участк", "склон", "рельеф", "site", "plot", "yard", "slope"],
            ),
            KeywordGroup::new(
                "problems",
                &[
                    "болезн", "пятна", "вредител", "желте", "сохнет", "disease", "spots", "pest",
                    "yellow", "wilting", "identify", "что за",
                ],
            ),
        ],
    }
}

pub fn image_editor() -> AgentProfile {
    AgentProfile {
        id: "image_editor".into(),
        name: "Image Editor".into(),
        description: "Edits an existing garden photo or design render".into(),
        capabilities: caps(&[
            Capability::ImageEditing,
            Capability::ImageGeneration,
            Capability::ImageAnalysis,
            Capability::LandscapeDesign,
        ]),
        system_prompt: "You edit garden photos and design renders. Keep everything the \
            user did not ask to change. Apply the requested change faithfully and say \
            briefly what you changed."
            .into(),
        keywords: vec![
            KeywordGroup::new(
                "edit",
                &[
                    "измени", "замени", "убери", "добавь", "перекрась", "отредактируй", "edit",
                    "change", "replace", "remove", "add", "recolor",
                ],
            ),
            KeywordGroup::new(
                "target",
                &["на фото", "на картинке", "на этом", "in the photo", "in the picture", "this image"],
            ),
        ],
    }
}

/// The built-in profiles in registration order.
pub fn builtin() -> Vec<AgentProfile> {
    vec![
        garden_consultant(),
        landscape_designer(),
        site_analyst(),
        image_editor(),
    ]
}
