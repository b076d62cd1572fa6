/// Display names for the pipeline's agents, in pipeline order.
const STAGE_LABELS: &[(&str, &str)] = &[
    ("system", "System"),
    ("data_preparation_agent", "Data preparation"),
    ("requirements_extractor", "Requirements"),
    ("information_architect", "Information architecture"),
    ("navigation_manager_agent", "Navigation"),
    ("wireframe_llm_agent", "Wireframe"),
    ("base_wireframe_agent", "Wireframe"),
    ("theme_designer", "Theme"),
    ("asset_planner", "Asset planning"),
    ("interaction_planner", "Interactions"),
    ("asset_prompt_generator", "Asset prompts"),
    ("asset_generator", "Asset generation"),
    ("coding_agent", "Coding"),
    ("publisher_agent", "Publishing"),
];

/// Human label for an author; unknown authors are shown verbatim.
pub fn stage_label(author: &str) -> &str {
    STAGE_LABELS
        .iter()
        .find(|(name, _)| *name == author)
        .map(|(_, label)| *label)
        .unwrap_or(author)
}
