//! Brand and use case guideline texts embedded in the refinement and polish
//! prompts

pub const BRAND_LANGUAGE_GUIDELINES: &str = "\
- Content is written at an 8th-grade reading level: easy for anyone to understand.
- Content is written in the active voice; passive voice is avoided.
- Content addresses the reader as \"you\"; third-person references are avoided.
- Content is written in a conversational, action-oriented tone. Assume the \
knowledge of an average junior developer and define advanced terms.
- Content is in US English: US spelling, grammar, and punctuation.
- Content is concise: writing is focused and to-the-point.
- Text longer than a sentence is broken down into bullets.
- Bullets, headings, and formatting help scanning.
- Content is free of spelling, grammar, and punctuation errors.
- Grammar and punctuation follow the Chicago Manual of Style.
- Sentence case is used for all titles and headings.
- Words are used for numbers zero through nine, numerals for 10 and above; \
dates follow \"Month Day, Year\"; percentages use %.
- All original sources are cited and linked.
- Writing is bias-free and uses gender-neutral, asset-based, specific language.
- Writing avoids outdated or inappropriate acronyms.";

pub const USE_CASE_GUIDELINES: &str = "\
Use Case Guidelines:
1. Structure and Format:
   - Follow the provided structure consistently
   - Include all required sections: Overview, Description, Objective, Prerequisites, Steps
   - Ensure each section has a clear purpose and adds value

2. Content Quality Standards:
   - Clear, specific, time-bound, relevant, achievable goals
   - Repeatable, measurable processes and outcomes
   - Each step must be essential and purposeful
   - Steps should be sequential, logical, and self-contained

3. Technical Aspects:
   - Include accurate time estimates for completion
   - Clearly define all prerequisites and dependencies
   - Specify required tools, permissions, and resources
   - Document potential obstacles and mitigation strategies

4. Implementation Guidance:
   - Provide concrete, actionable examples where appropriate
   - Include verification steps to confirm successful completion
   - Define measurable success criteria
   - Address common variations and edge cases";
