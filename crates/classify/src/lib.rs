//! IPC classification helpers.
//!
//! Provides pure functions over International Patent Classification codes:
//! - Main code extraction (leading 4 characters of the primary code)
//! - Korean category names for IPC subclasses

/// Name returned for subclasses missing from the table.
pub const UNKNOWN_CLASSIFICATION: &str = "Unknown";

/// IPC subclass → Korean category name. Sorted by code.
static SUBCLASS_NAMES: &[(&str, &str)] = &[
    ("A01B", "토양 경작"),
    ("A01N", "생물 보존 및 살생물제"),
    ("A23L", "식품 및 식료품"),
    ("A61B", "진단 및 수술"),
    ("A61F", "인체 삽입 필터 및 보철"),
    ("A61K", "의약용 제제"),
    ("A61P", "화합물 및 의약 제제의 치료 활성"),
    ("A63F", "카드, 보드 및 비디오 게임"),
    ("B01D", "분리"),
    ("B01J", "화학적 또는 물리적 방법 및 촉매"),
    ("B23K", "납땜 및 용접"),
    ("B25J", "매니퓰레이터 및 로봇"),
    ("B29C", "플라스틱 성형"),
    ("B32B", "적층체"),
    ("B60L", "전기 추진 차량"),
    ("B60R", "차량 부속품"),
    ("B60W", "차량 보조 장치 협조 제어"),
    ("B62D", "자동차 및 트레일러"),
    ("B65D", "용기 및 포장"),
    ("B65G", "운반 및 저장 장치"),
    ("C01B", "비금속 원소 및 화합물"),
    ("C07D", "복소환식 화합물"),
    ("C07K", "펩티드"),
    ("C08F", "고분자 중합"),
    ("C08K", "무기 또는 저분자 배합 성분"),
    ("C08L", "고분자 조성물"),
    ("C09D", "코팅 조성물"),
    ("C09K", "기타 응용 물질"),
    ("C12N", "미생물 및 효소"),
    ("C12Q", "효소 또는 미생물 측정 및 시험"),
    ("C22C", "합금"),
    ("C23C", "금속 피복"),
    ("E04B", "일반 건축 구조"),
    ("E04F", "건물 마감 작업"),
    ("F01N", "배기 장치"),
    ("F02M", "연료 공급"),
    ("F16H", "전동 장치"),
    ("F21V", "조명 장치"),
    ("F24F", "공기 조화"),
    ("F25D", "냉장 및 냉동 장치"),
    ("G01N", "재료 분석"),
    ("G01R", "전기량 측정"),
    ("G01S", "무선 방향 탐지 및 측위"),
    ("G02B", "광학 요소"),
    ("G02F", "광학 장치 및 액정"),
    ("G03F", "포토리소그래피"),
    ("G05B", "제어 및 조정 시스템"),
    ("G06F", "전기 디지털 데이터 처리"),
    ("G06K", "데이터 인식 및 표시"),
    ("G06N", "특정 계산 모델 기반 컴퓨터 시스템"),
    ("G06Q", "경영 및 상업용 데이터 처리 시스템"),
    ("G06T", "이미지 데이터 처리"),
    ("G06V", "이미지 및 영상 인식"),
    ("G08G", "교통 제어 시스템"),
    ("G09G", "표시 장치 제어"),
    ("G10L", "음성 분석 및 합성"),
    ("G11C", "정적 기억 장치"),
    ("G16H", "헬스케어 정보학"),
    ("H01G", "커패시터"),
    ("H01L", "반도체 장치"),
    ("H01M", "전지"),
    ("H01Q", "안테나"),
    ("H02J", "전력 공급 및 배전"),
    ("H02K", "발전기 및 전동기"),
    ("H02M", "전력 변환"),
    ("H03K", "펄스 기술"),
    ("H03M", "부호화 및 복호화"),
    ("H04B", "전송"),
    ("H04L", "디지털 정보 전송"),
    ("H04M", "전화 통신"),
    ("H04N", "영상 통신"),
    ("H04Q", "선택 및 교환"),
    ("H04R", "스피커 및 마이크로폰"),
    ("H04W", "무선 통신 네트워크"),
    ("H05B", "전기 가열 및 조명"),
    ("H05K", "인쇄 회로 및 전기 장치 케이스"),
    ("H10K", "유기 전기 소자"),
];

/// Extract the main code from a pipe-delimited IPC list.
///
/// Takes the first `|` token, drops all whitespace, and keeps at most four
/// characters: `"G06F 17/30|H04L 29/06"` becomes `"G06F"`. Returns `None`
/// when nothing is left.
pub fn main_code(classification_codes: &str) -> Option<String> {
    let primary = classification_codes.split('|').next()?;
    let code: String = primary
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(4)
        .collect();

    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Korean name for a main IPC code, or [`UNKNOWN_CLASSIFICATION`].
pub fn korean_name(code: &str) -> &'static str {
    let code = code.trim();
    SUBCLASS_NAMES
        .binary_search_by(|(c, _)| (*c).cmp(code))
        .map(|idx| SUBCLASS_NAMES[idx].1)
        .unwrap_or(UNKNOWN_CLASSIFICATION)
}

/// Main code and its name in one step.
pub fn resolve(classification_codes: &str) -> (Option<String>, &'static str) {
    match main_code(classification_codes) {
        Some(code) => {
            let name = korean_name(&code);
            (Some(code), name)
        }
        None => (None, UNKNOWN_CLASSIFICATION),
    }
}
