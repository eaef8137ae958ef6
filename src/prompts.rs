//! Prompts and fixed text assets for report generation.
//!
//! Every string the model sees, and every string the pipeline substitutes
//! when the model cannot be used, lives here. The reports are written in
//! Portuguese for Senac course-plan reviews, so the texts are too.
//!
//! Unit tests can inspect prompts directly without a live completion
//! service, which makes prompt regressions easy to catch.

/// Number of section slots in every report.
pub const SECTION_COUNT: usize = 24;

// ── Structure extraction ─────────────────────────────────────────────────

/// System prompt for deriving the report structure from the specification.
pub const STRUCTURE_SYSTEM_PROMPT: &str = "Você é um pedagogo especialista em Educação Profissional do setor secundário (Comércio de Bens e Serviços). Sua tarefa é identificar a estrutura proposta de um relatório de análise de Plano de Curso Nacional a partir de um prompt.";

/// User prompt asking for exactly 24 numbered titles.
pub fn structure_user_prompt(specification: &str) -> String {
    format!(
        r#"
Analise o prompt abaixo e liste APENAS os títulos dos 24 itens que devem compor o relatório final.
Forneça apenas a numeração e o título de cada item, sem explicações adicionais.

PROMPT:
{specification}

Formato esperado:
1. Título do Item 1
2. Título do Item 2
...
24. Título do Item 24
"#
    )
}

/// Canonical report structure used when extraction is unreliable.
///
/// Versioned asset: change it only together with the specification text.
pub const FALLBACK_STRUCTURE: [&str; SECTION_COUNT] = [
    "Cabeçalho",
    "Tabela de Impacto por cada Unidade Curricular (UC)",
    "Tabela com propostas de novos nomes para cada UC",
    "Perfil Profissional de Conclusão",
    "Sugestões de Atualizações para o Perfil Profissional de Conclusão",
    "Tabela Comparativa de Carga Horária por cada UC",
    "Tabela com alterações dos “Indicadores” de cada competência/Unidade Curricular (UC)",
    "Tabela com alterações dos “Conhecimentos” de cada competência/Unidade Curricular (UC)",
    "Tabela com alterações das “Habilidades” de cada competência/Unidade Curricular (UC)",
    "Tabela com alterações das “Atitudes/Valores” de cada competência/Unidade Curricular (UC)",
    "Principal tipo de tecnologias que impactam as competências da profissão",
    "Justificativa da resposta do item 11 (Principal tipo de tecnologias que impactam as competências da profissão)",
    "Principal tipo de impacto nas competências da profissão",
    "Justificativa da resposta do item 13 (Principal tipo de impacto nas competências da profissão)",
    "O PCN deve ser Mantido, Atualizado ou Descontinuado?",
    "Justificativa da resposta do item 15 (PCN deve ser Mantido, Atualizado ou Descontinuado?).",
    "Qual o horizonte de atualização do PCN (caso a resposta do item 13 seja ‘Atualizado’)?",
    "Justificativa da resposta do item 176 (horizonte de atualização do PCN).",
    "Sugestão do nome de novo curso (caso seja sugerida a descontinuidade do PCN avaliado no item 13)",
    "Justificativa da resposta do item 19 (Sugestão do nome de novo curso).",
    "Sugestões para atualização de PTDs",
    "Projeto Integrador",
    "Instalações, Equipamentos e Recursos Didáticos",
    "Tabela de referências",
];

// ── Curricular unit extraction ───────────────────────────────────────────

/// System prompt for listing the curricular units of a course plan.
pub const FACTS_SYSTEM_PROMPT: &str = "Você é um pedagogo especialista em Educação Profissional do setor secundário (Comércio de Bens e Serviços). Identifique precisamente as Unidades Curriculares listadas no documento.";

/// User prompt requesting the `UC<n>: <name>` enumeration.
pub fn facts_user_prompt(subject: &str) -> String {
    format!(
        r#"
Analise o documento abaixo e extraia APENAS a lista completa de Unidades Curriculares (UCs) mencionadas.
Para cada UC, forneça o número e o nome/título exato como aparece no documento.

DOCUMENTO:
{subject}

Formato esperado:
UC1: [Nome da UC1]
UC2: [Nome da UC2]
...
"#
    )
}

/// Context used in place of the unit list when extraction fails.
pub const UNITS_UNAVAILABLE: &str =
    "Não foi possível extrair as Unidades Curriculares automaticamente.";

// ── Section generation ───────────────────────────────────────────────────

/// Persona that restricts the model to a single section.
pub fn section_system_prompt(section: usize) -> String {
    format!(
        "Você é um especialista em educação profissional do Senac. Gere APENAS o item {section} do relatório conforme solicitado."
    )
}

pub const HEADER_INSTRUCTIONS: &str = r#"
Inclua todos os subitens solicitados: nome do curso, carga horária, eixo tecnológico, segmento profissional,
ano de criação/revisão, quantidade de UCs e lista completa das UCs.
"#;

pub const TABLE_INSTRUCTIONS: &str = r#"
IMPORTANTE:
- Formate a tabela corretamente
- Inclua TODAS as Unidades Curriculares do curso na tabela
- Forneça apenas o título e a tabela, sem explicações adicionais
- Na tabela comparativa de carga horária por cada uc, crie a tabela mostrando a carga horária anterior e a nova, com o campo para justificativa da nova carga horária
"#;

pub const SINGLE_CHOICE_INSTRUCTIONS: &str = r#"
Forneça apenas a resposta direta conforme as opções permitidas, sem explicações adicionais.
"#;

pub const JUSTIFICATION_INSTRUCTIONS: &str = r#"
Forneça uma justificativa detalhada em texto por extenso com aproximadamente 2.000 caracteres.
"#;

pub const CONCLUSION_PROFILE_INSTRUCTIONS: &str = r#"
Listar o Perfil Profissional de Conclusão conforme descrito no plano de curso.
"#;

pub const PROFILE_UPDATES_INSTRUCTIONS: &str = r#"
- Ao revisar o Plano de Curso, item 4 (Perfil Profissional de Conclusão), adicionar uma seção "Sugestões de Atualizações para o Perfil Profissional de Conclusão", indique atualizações considerando possíveis mudanças no contexto de atuação profissional, inovações do setor ou novos arranjos produtivos e organizacionais(Considere o documento impacto da automação).
As propostas de atualização devem se limitar aos seguintes trechos:
Texto introdutório sobre o profissional e suas atribuições;
Campo de atuação e formas de interação com outros profissionais e setores.
"#;

pub const TEACHING_PLAN_INSTRUCTIONS: &str = r#"
Escreva sugestões de orientações para que os docentes atualizem seus Planos de Trabalho Docente (PTDs) até o novo PCN entrar em vigor (estas orientações seriam enviadas para os supervisores pedagógicos). A resposta deve ser em texto por extenso com aproximadamente 2.000 caracteres.
Texto introdutório sobre o profissional e suas atribuições;
Campo de atuação e formas de interação com outros profissionais e setores.
"#;

pub const FACILITIES_INSTRUCTIONS: &str = r#"
Atualizações nos Instalações, Equipamentos e Recursos Didáticos:
Inserir as demandas por equipamentos e recursos necessários à implementação das atualizações sugeridas nas Unidades Curriculares. Caso alguma UC seja impactada por transformações decorrentes da automação, devem ser especificados os recursos e adequações requeridos nos ambientes de aprendizagem para sua viabilização.
"#;

/// Block appended to table instructions with the extracted unit list.
pub fn curricular_units_block(units: &str) -> String {
    format!("\n\nUNIDADES CURRICULARES DO CURSO:\n{units}\n")
}

/// Referenced-context block for a justification section.
pub fn prior_section_context(referenced: usize, content: &str) -> String {
    format!("Item {referenced} (que você está justificando): {content}\n\n")
}

/// Pieces of the user message for one section request.
#[derive(Debug, Clone, Copy)]
pub struct SectionPromptParts<'a> {
    pub section: usize,
    pub title: &'a str,
    pub subject_name: &'a str,
    pub prior_context: &'a str,
    pub instructions: &'a str,
    pub subject: &'a str,
    pub reference: &'a str,
    pub specification: &'a str,
}

/// Compose the user message for one section.
pub fn section_user_prompt(p: &SectionPromptParts<'_>) -> String {
    let n = p.section;
    let title = p.title;
    format!(
        r#"
Gere APENAS o item {n} ({title}) do relatório para o PCN "{subject_name}", seguindo exatamente o formato solicitado.

{prior_context}
{instructions}

ESTRUTURA DO RELATÓRIO:
Item {n}: {title}

DOCUMENTO PC:
{subject}

DOCUMENTOS DE REFERÊNCIA:
{reference}

PROMPT ORIGINAL:
{specification}

Forneça apenas o conteúdo do item {n}, começando com o título "{heading}".
"#,
        subject_name = p.subject_name,
        prior_context = p.prior_context,
        instructions = p.instructions,
        subject = p.subject,
        reference = p.reference,
        specification = p.specification,
        heading = canonical_heading(n, title),
    )
}

// ── Placeholders and fixed report text ───────────────────────────────────

/// `## <n>. <title>`: the marker every section starts with.
pub fn canonical_heading(section: usize, title: &str) -> String {
    format!("## {section}. {title}")
}

/// Body substituted when a section could not be generated.
pub const SECTION_FAILED_BODY: &str = "Não foi possível gerar este item automaticamente.";

/// Title used for a slot missing from the report structure.
pub const UNDEFINED_SECTION_TITLE: &str = "Item não definido";

/// Body used for a slot missing from the report structure.
pub const UNDEFINED_SECTION_BODY: &str =
    "Este item não foi encontrado na estrutura do relatório.";

/// Sentinel prefix embedded as document text when PDF extraction fails.
pub const EXTRACTION_ERROR_PREFIX: &str = "ERRO NA EXTRAÇÃO:";

/// First line of every assembled report.
pub fn report_title(subject_name: &str) -> String {
    format!("# Revisão do PCN \"{subject_name}\"")
}

/// Centered, bold attribution appended after the rendered content.
pub const ATTRIBUTION_FOOTER: &str =
    "DESENVOLVIDO POR SENAC DEPARTAMENTO NACIONAL - GER. DE TECNOLOGIAS E DESENHOS EDUCACIONAIS.";
