use crate::model::Status;

const DIABETIC: [&str; 7] = [
    "Schedule an appointment with an endocrinologist as soon as possible",
    "Begin a low-glycemic diet focusing on whole foods and vegetables",
    "Start monitoring blood sugar levels daily before meals and at bedtime",
    "Begin moderate exercise regimen (30 mins/day, 5 days/week)",
    "Consider medication management with Metformin as first-line therapy",
    "Schedule quarterly HbA1c tests to monitor long-term glucose control",
    "Attend diabetes education classes for self-management training",
];

const NON_DIABETIC: [&str; 7] = [
    "Continue annual preventive health check-ups",
    "Maintain balanced diet with controlled carbohydrate intake",
    "Engage in regular physical activity (150 mins/week minimum)",
    "Monitor weight and maintain BMI between 18.5-24.9",
    "Limit processed foods and sugary beverages",
    "Get fasting blood glucose test annually",
    "Practice stress-reduction techniques like meditation",
];

pub fn for_status(status: Status) -> &'static [&'static str] {
    match status {
        Status::Diabetic => &DIABETIC,
        Status::NonDiabetic => &NON_DIABETIC,
    }
}
